//! Integration tests for void_spatial against a fixed six-object scene

use std::collections::BTreeSet;
use std::sync::Arc;

use void_spatial::prelude::*;

/// Static scene object with a name for readable failures
#[derive(Debug)]
struct Prop {
    id: u64,
    name: &'static str,
    bounds: AABB,
}

impl SceneObject for Prop {
    fn id(&self) -> ObjectId {
        ObjectId::new(self.id)
    }

    fn bounds(&self) -> AABB {
        self.bounds
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Six boxes spread along increasing x
fn scene() -> Vec<Arc<Prop>> {
    let boxes = [
        ("Object0", Vec3::new(-5.0, 0.0, 0.0), 1.0),
        ("Object1", Vec3::new(-2.0, 2.0, 0.0), 0.5),
        ("Object2", Vec3::new(0.5, -2.0, 0.0), 0.5),
        ("Object3", Vec3::new(2.0, 0.0, 0.0), 0.5),
        ("Object4", Vec3::new(6.0, 0.0, 0.0), 1.0),
        ("Object5", Vec3::new(9.0, 3.0, 0.0), 0.5),
    ];
    boxes
        .iter()
        .enumerate()
        .map(|(i, &(name, center, half))| {
            Arc::new(Prop {
                id: i as u64,
                name,
                bounds: AABB::from_center_half_extents(center, Vec3::splat(half)),
            })
        })
        .collect()
}

fn names(objects: &[Arc<Prop>]) -> BTreeSet<&'static str> {
    objects.iter().map(|prop| prop.name).collect()
}

fn built(kind: SceneTreeKind) -> Box<dyn SceneTree<Arc<Prop>>> {
    init_logging();
    let mut tree = kind
        .create(TreeContext::new(format!("scenario-{kind:?}")), BvhConfig::default())
        .expect("default config is valid");
    tree.add_objects(scene());
    tree.restructure();
    tree
}

#[test]
fn test_ray_hits_in_order() {
    for kind in [SceneTreeKind::Bvh, SceneTreeKind::Linear] {
        let tree = built(kind);
        let hits = tree.ray_intersections(&Ray::new(Vec3::new(-10.0, 0.0, 0.0), Vec3::X));

        let order: Vec<&str> = hits.iter().map(|hit| hit.object.name).collect();
        assert_eq!(order, vec!["Object0", "Object3", "Object4"], "{kind:?}");

        let distances: Vec<f32> = hits.iter().map(|hit| hit.distance).collect();
        approx::assert_relative_eq!(distances[0], 4.0);
        approx::assert_relative_eq!(distances[1], 11.5);
        approx::assert_relative_eq!(distances[2], 15.0);
    }
}

#[test]
fn test_sphere_query() {
    for kind in [SceneTreeKind::Bvh, SceneTreeKind::Linear] {
        let tree = built(kind);
        let found = tree.query_sphere(&Sphere::new(Vec3::ZERO, 3.0));

        assert_eq!(found.len(), 3, "{kind:?}");
        assert_eq!(names(&found), BTreeSet::from(["Object1", "Object2", "Object3"]));
    }
}

#[test]
fn test_aabb_query() {
    for kind in [SceneTreeKind::Bvh, SceneTreeKind::Linear] {
        let tree = built(kind);
        let found = tree.query_aabb(&AABB::from_center_half_extents(Vec3::ZERO, Vec3::splat(3.0)));

        assert_eq!(found.len(), 3, "{kind:?}");
        assert_eq!(names(&found), BTreeSet::from(["Object1", "Object2", "Object3"]));
    }
}

#[test]
fn test_obb_query_matches_aabb_when_unrotated() {
    let tree = built(SceneTreeKind::Bvh);
    let obb = Obb::new(Vec3::ZERO, Vec3::splat(3.0), Quat::IDENTITY);

    assert_eq!(names(&tree.query_obb(&obb)), BTreeSet::from(["Object1", "Object2", "Object3"]));
}

#[test]
fn test_frustum_from_camera() {
    let tree = built(SceneTreeKind::Bvh);

    // Looking down -Z at the origin, narrow enough to leave out both ends
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_rh(30f32.to_radians(), 1.0, 0.1, 100.0);
    let frustum = FrustumPlanes::from_view_projection(&(proj * view), ClipDepth::ZeroToOne);

    let visible = names(&tree.visible_objects(&frustum));
    assert_eq!(visible, BTreeSet::from(["Object1", "Object2", "Object3"]));
}

#[test]
fn test_orthographic_frustum() {
    let tree = built(SceneTreeKind::Bvh);

    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::orthographic_rh(4.0, 10.0, -1.0, 4.0, 0.1, 100.0);
    let frustum = FrustumPlanes::from_view_projection(&(proj * view), ClipDepth::ZeroToOne);

    let visible = names(&tree.visible_objects(&frustum));
    assert_eq!(visible, BTreeSet::from(["Object4", "Object5"]));
}

#[test]
fn test_remove_then_query() {
    let mut tree = built(SceneTreeKind::Bvh);
    let objects = scene();

    assert!(tree.remove_object(&objects[3]));
    assert_eq!(tree.len(), 5);
    assert!(!tree.contains_object(&objects[3], true));

    let hits = tree.ray_intersections(&Ray::new(Vec3::new(-10.0, 0.0, 0.0), Vec3::X));
    let order: Vec<&str> = hits.iter().map(|hit| hit.object.name).collect();
    assert_eq!(order, vec!["Object0", "Object4"]);
}

#[test]
fn test_destroy_leaves_objects_alive() {
    let objects = scene();
    let mut tree = BvhTree::new(TreeContext::new("destroy"));
    tree.add_objects(objects.iter().cloned());
    tree.restructure();
    assert_eq!(Arc::strong_count(&objects[0]), 3);

    tree.destroy();
    assert_eq!(tree.state(), TreeState::Empty);
    assert!(tree.all_objects().is_empty());
    assert!(tree.root().is_none());
    assert_eq!(Arc::strong_count(&objects[0]), 1);
    assert_eq!(objects[4].name, "Object4");
}

#[test]
fn test_state_machine() {
    init_logging();
    let objects = scene();
    let mut tree = BvhTree::new(TreeContext::new("states").with_profiling(true));
    assert_eq!(tree.state(), TreeState::Empty);

    tree.add_objects(objects[..5].iter().cloned());
    assert_eq!(tree.state(), TreeState::Empty);
    assert_eq!(tree.restructure(), RestructureOutcome::Rebuilt { objects: 5 });
    assert_eq!(tree.state(), TreeState::Built);
    assert!(tree.stats().last_restructure.is_some());

    tree.add_object(objects[5].clone());
    assert_eq!(tree.state(), TreeState::Dirty);
    tree.restructure();
    assert_eq!(tree.state(), TreeState::Built);

    assert!(tree.set_dirty(ObjectId::new(2)));
    assert_eq!(tree.state(), TreeState::Dirty);
    tree.restructure();
    assert_eq!(tree.state(), TreeState::Built);

    tree.request_rebuild();
    assert_eq!(tree.restructure(), RestructureOutcome::Rebuilt { objects: 6 });
    assert_eq!(tree.restructure(), RestructureOutcome::Unchanged);

    assert_eq!(tree.remove_objects(objects.iter()), 6);
    assert_eq!(tree.state(), TreeState::Empty);
}
