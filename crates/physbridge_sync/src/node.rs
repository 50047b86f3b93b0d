//! # Scene Nodes
//!
//! Renderer objects are not bodies. A [`SceneNode`] wraps any renderer
//! node and may carry a [`PhysicsHandle`]; the handle is just an id, and
//! everything it reads goes through the [`Scene`] that owns the body.

use crate::body::Body;
use crate::error::SyncResult;
use crate::scene::Scene;
use crate::transport::Transport;
use physbridge_shared::{EntityId, Quat, Vec3};

/// Renderer nodes that can receive a simulated transform.
pub trait NodeTransform {
    /// Overwrites the node's transform.
    fn set_transform(&mut self, position: Vec3, rotation: Quat);
}

/// Physics capability of a scene node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysicsHandle {
    id: EntityId,
}

impl PhysicsHandle {
    /// Handle for body `id`.
    #[must_use]
    pub const fn new(id: EntityId) -> Self {
        Self { id }
    }

    /// Body id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// The body's shadow state, if it is still registered.
    #[must_use]
    pub fn body<'s, T: Transport>(&self, scene: &'s Scene<T>) -> Option<&'s Body> {
        scene.body(self.id)
    }

    /// Current position.
    #[must_use]
    pub fn position<T: Transport>(&self, scene: &Scene<T>) -> Option<Vec3> {
        self.body(scene).map(Body::position)
    }

    /// Current rotation.
    #[must_use]
    pub fn rotation<T: Transport>(&self, scene: &Scene<T>) -> Option<Quat> {
        self.body(scene).map(Body::rotation)
    }

    /// Last reported linear velocity.
    #[must_use]
    pub fn linear_velocity<T: Transport>(&self, scene: &Scene<T>) -> Option<Vec3> {
        self.body(scene).map(Body::linear_velocity)
    }

    /// Last reported angular velocity.
    #[must_use]
    pub fn angular_velocity<T: Transport>(&self, scene: &Scene<T>) -> Option<Vec3> {
        self.body(scene).map(Body::angular_velocity)
    }

    /// Returns true if this body is touching `other`.
    #[must_use]
    pub fn is_touching<T: Transport>(&self, scene: &Scene<T>, other: &Self) -> bool {
        self.body(scene).is_some_and(|b| b.is_touching(other.id))
    }

    /// Authors a position. Sent with the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::UnknownEntity`] if the body was removed.
    pub fn set_position<T: Transport>(&self, scene: &mut Scene<T>, position: Vec3) -> SyncResult<()> {
        scene.set_position(self.id, position)
    }

    /// Authors a rotation. Sent with the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::UnknownEntity`] if the body was removed.
    pub fn set_rotation<T: Transport>(&self, scene: &mut Scene<T>, rotation: Quat) -> SyncResult<()> {
        scene.set_rotation(self.id, rotation)
    }
}

/// A renderer node with optional physics.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode<N> {
    node: N,
    physics: Option<PhysicsHandle>,
}

impl<N> SceneNode<N> {
    /// A node with no physics.
    pub const fn new(node: N) -> Self {
        Self { node, physics: None }
    }

    /// A node driven by body `handle`.
    pub const fn with_physics(node: N, handle: PhysicsHandle) -> Self {
        Self { node, physics: Some(handle) }
    }

    /// The renderer node.
    pub const fn node(&self) -> &N {
        &self.node
    }

    /// The renderer node, mutably.
    pub fn node_mut(&mut self) -> &mut N {
        &mut self.node
    }

    /// Physics handle, if the node is simulated.
    pub const fn physics(&self) -> Option<PhysicsHandle> {
        self.physics
    }

    /// Attaches a body, returning the previous handle.
    pub fn attach(&mut self, handle: PhysicsHandle) -> Option<PhysicsHandle> {
        self.physics.replace(handle)
    }

    /// Detaches the body. The body itself stays in the scene.
    pub fn detach(&mut self) -> Option<PhysicsHandle> {
        self.physics.take()
    }

    /// Unwraps the renderer node.
    pub fn into_inner(self) -> N {
        self.node
    }
}

impl<N: NodeTransform> SceneNode<N> {
    /// Copies the body's transform onto the renderer node.
    ///
    /// Returns `false` if the node has no physics or its body is gone.
    pub fn pull<T: Transport>(&mut self, scene: &Scene<T>) -> bool {
        let Some(body) = self.physics.and_then(|h| scene.body(h.id)) else {
            return false;
        };
        self.node.set_transform(body.position(), body.rotation());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyBuilder;
    use crate::config::SceneConfig;
    use crate::report::encode;
    use crate::transport::ChannelTransport;
    use physbridge_shared::{CollisionItem, ShapeDescriptor, TransferBuffer, WorldItem};

    #[derive(Debug, Default)]
    struct Mesh {
        position: Vec3,
        rotation: Quat,
    }

    impl NodeTransform for Mesh {
        fn set_transform(&mut self, position: Vec3, rotation: Quat) {
            self.position = position;
            self.rotation = rotation;
        }
    }

    fn cube() -> BodyBuilder {
        BodyBuilder::new(ShapeDescriptor::Box { width: 1.0, height: 1.0, depth: 1.0 })
    }

    #[test]
    fn test_pull_copies_simulated_transform() {
        let (transport, _worker) = ChannelTransport::pair(true);
        let mut scene = Scene::new(SceneConfig::default(), transport).unwrap();
        let mut node = scene.spawn(Mesh::default(), cube());
        let id = node.physics().unwrap().id();

        let item = WorldItem {
            id: id.to_scalar(),
            position: Vec3::new(0.0, 4.0, 0.0),
            rotation: Quat::IDENTITY,
            ..WorldItem::default()
        };
        scene.handle_report(encode(&[item], TransferBuffer::new())).unwrap();

        assert!(node.pull(&scene));
        assert_eq!(node.node().position, Vec3::new(0.0, 4.0, 0.0));
    }

    #[test]
    fn test_pull_without_physics() {
        let (transport, _worker) = ChannelTransport::pair(true);
        let scene = Scene::new(SceneConfig::default(), transport).unwrap();
        let mut node = SceneNode::new(Mesh::default());
        assert!(!node.pull(&scene));
    }

    #[test]
    fn test_handle_reads_and_writes_through_scene() {
        let (transport, _worker) = ChannelTransport::pair(true);
        let mut scene = Scene::new(SceneConfig::default(), transport).unwrap();
        let a = PhysicsHandle::new(scene.add_body(cube()));
        let b = PhysicsHandle::new(scene.add_body(cube()));

        a.set_position(&mut scene, Vec3::new(3.0, 0.0, 0.0)).unwrap();
        assert_eq!(a.position(&scene), Some(Vec3::new(3.0, 0.0, 0.0)));
        assert!(a.body(&scene).unwrap().dirty_position());

        let contact = CollisionItem { id_a: a.id().to_scalar(), id_b: b.id().to_scalar(), normal: Vec3::Y };
        scene.handle_report(encode(&[contact], TransferBuffer::new())).unwrap();
        assert!(a.is_touching(&scene, &b));
        assert!(b.is_touching(&scene, &a));

        scene.remove_body(b.id()).unwrap();
        assert_eq!(b.position(&scene), None);
        assert!(b.set_rotation(&mut scene, Quat::IDENTITY).is_err());
    }

    #[test]
    fn test_attach_and_detach() {
        let mut node = SceneNode::new(Mesh::default());
        let handle = PhysicsHandle::new(EntityId::from_raw(5));
        assert_eq!(node.attach(handle), None);
        assert_eq!(node.detach(), Some(handle));
        assert_eq!(node.physics(), None);
    }
}
