//! Read-only queries from several threads between scene updates

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use void_spatial::prelude::*;

#[derive(Debug)]
struct Instance {
    id: u64,
    bounds: AABB,
}

impl SceneObject for Instance {
    fn id(&self) -> ObjectId {
        ObjectId::new(self.id)
    }

    fn bounds(&self) -> AABB {
        self.bounds
    }
}

fn scene(seed: u64, count: u64) -> Vec<Arc<Instance>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|id| {
            let center = Vec3::new(
                rng.gen_range(-200.0..200.0),
                rng.gen_range(-20.0..20.0),
                rng.gen_range(-200.0..200.0),
            );
            Arc::new(Instance {
                id,
                bounds: AABB::from_center_half_extents(center, Vec3::splat(rng.gen_range(0.5..4.0))),
            })
        })
        .collect()
}

#[test]
fn test_parallel_readers_agree() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BvhTree::new(TreeContext::new("parallel"));
    tree.add_objects(scene(41, 2000));
    tree.restructure();

    let view = Mat4::look_at_rh(Vec3::new(0.0, 50.0, 250.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_rh(1.0, 16.0 / 9.0, 0.1, 500.0);
    let frustum = FrustumPlanes::from_view_projection(&(proj * view), ClipDepth::ZeroToOne);
    let ray = Ray::new(Vec3::new(-300.0, 0.0, 0.0), Vec3::X);

    let expected_visible: BTreeSet<u64> = tree.visible_objects(&frustum).iter().map(|o| o.id).collect();
    let expected_hits: Vec<u64> = tree.ray_intersections(&ray).iter().map(|h| h.object.id).collect();

    // Render and picking jobs share the tree between updates
    let tree = &tree;
    thread::scope(|scope| {
        for worker in 0..4 {
            let frustum = &frustum;
            let expected_visible = &expected_visible;
            let expected_hits = &expected_hits;
            scope.spawn(move || {
                for _ in 0..25 {
                    if worker % 2 == 0 {
                        let visible: BTreeSet<u64> =
                            tree.visible_objects(frustum).iter().map(|o| o.id).collect();
                        assert_eq!(&visible, expected_visible);
                    } else {
                        let hits: Vec<u64> =
                            tree.ray_intersections(&ray).iter().map(|h| h.object.id).collect();
                        assert_eq!(&hits, expected_hits);
                    }
                }
            });
        }
    });
}

#[test]
fn test_update_then_read_phases() {
    let objects = scene(43, 500);
    let mut tree = BvhTree::new(TreeContext::new("phases"));
    tree.add_objects(objects[..400].iter().cloned());
    tree.restructure();

    for frame in 0..5 {
        // Update phase: single owner mutates
        let start = 400 + frame * 20;
        tree.add_objects(objects[start..start + 20].iter().cloned());
        tree.remove_object(&objects[frame * 3]);
        tree.restructure();

        // Read phase: shared borrows only
        let probe = Sphere::new(Vec3::ZERO, 60.0);
        let counts: Vec<usize> = thread::scope(|scope| {
            let handles: Vec<_> = (0..3)
                .map(|_| scope.spawn(|| tree.query_sphere(&probe).len()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("reader panicked"))
                .collect()
        });
        assert!(counts.windows(2).all(|pair| pair[0] == pair[1]));
        assert!(tree.validate().is_ok());
    }
    assert_eq!(tree.len(), 400 + 100 - 5);
}
