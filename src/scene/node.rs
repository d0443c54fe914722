//! Scene-graph nodes and world-matrix propagation.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::scene::Mesh;

/// The transform data of a scene-graph node.
pub struct SceneNodeData {
    parent: Option<Weak<RefCell<SceneNodeData>>>,
    children: Vec<SceneNode>,
    /// Invisible nodes are pruned from rendering together with their
    /// whole subtree.
    pub visible: bool,
    /// Local transform relative to the parent.
    pub matrix: Mat4,
    /// Composed transform relative to the scene root. Valid after
    /// [`SceneNode::update_matrix_world`].
    pub world_matrix: Mat4,
    /// When set, `matrix` is recomposed from the position, quaternion
    /// and scale components on every world-matrix update. Turn it off
    /// to drive `matrix` directly.
    pub matrix_auto_update: bool,
    world_matrix_needs_update: bool,
    pub position: Vec3,
    pub quaternion: Quat,
    pub scale: Vec3,
    /// XYZ euler angles in radians. Mirrors `quaternion`; call
    /// [`update_rotation`](SceneNodeData::update_rotation) or
    /// [`update_quaternion`](SceneNodeData::update_quaternion) after
    /// editing either side.
    pub rotation: Vec3,
    pub up: Vec3,
    /// The mesh drawn at this node's transform, if any. Pure grouping
    /// nodes carry `None`.
    pub drawable: Option<Mesh>,
}

impl SceneNodeData {
    /// Rebuilds the quaternion from the euler `rotation`.
    pub fn update_rotation(&mut self) {
        self.quaternion = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
    }

    /// Rebuilds the euler `rotation` from the quaternion.
    pub fn update_quaternion(&mut self) {
        let (x, y, z) = self.quaternion.to_euler(EulerRot::XYZ);
        self.rotation = Vec3::new(x, y, z);
    }

    /// Recomposes the local matrix and flags the world matrix stale.
    pub fn update_matrix(&mut self) {
        self.matrix = Mat4::from_scale_rotation_translation(self.scale, self.quaternion, self.position);
        self.world_matrix_needs_update = true;
    }

    /// Orients the node so its negative z axis points at `target`.
    ///
    /// # Arguments
    /// * `invert` - Look from the node towards the target instead of the
    ///   other way around. Cameras pass `true`.
    pub fn look_at(&mut self, target: Vec3, invert: bool) {
        let matrix = if invert {
            Mat4::look_at_rh(self.position, target, self.up).inverse()
        } else {
            Mat4::look_at_rh(target, self.position, self.up).inverse()
        };
        self.quaternion = Quat::from_mat4(&matrix);
        self.update_quaternion();
    }

    /// Splits the local matrix back into position, quaternion and scale.
    pub fn decompose(&mut self) {
        let (scale, quaternion, position) = self.matrix.to_scale_rotation_translation();
        self.scale = scale;
        self.quaternion = quaternion;
        self.position = position;
        self.update_quaternion();
    }

    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    // Recomposes world matrices down the subtree. Once a node is found
    // stale, every descendant is recomposed too.
    fn propagate_world_matrix(&mut self, parent_world: Option<Mat4>, mut force: bool) {
        if self.matrix_auto_update {
            self.update_matrix();
        }
        if self.world_matrix_needs_update || force {
            self.world_matrix = match parent_world {
                Some(parent_world) => parent_world * self.matrix,
                None => self.matrix,
            };
            self.world_matrix_needs_update = false;
            force = true;
        }
        let world_matrix = self.world_matrix;
        for child in &self.children {
            child.data_mut().propagate_world_matrix(Some(world_matrix), force);
        }
    }

    fn unlink_child(&mut self, child: &Rc<RefCell<SceneNodeData>>) {
        if let Some(i) = self
            .children
            .iter()
            .position(|other| Rc::ptr_eq(&other.data, child))
        {
            self.children.remove(i);
        }
    }
}

impl Default for SceneNodeData {
    fn default() -> SceneNodeData {
        SceneNodeData {
            parent: None,
            children: Vec::new(),
            visible: true,
            matrix: Mat4::IDENTITY,
            world_matrix: Mat4::IDENTITY,
            matrix_auto_update: true,
            world_matrix_needs_update: false,
            position: Vec3::ZERO,
            quaternion: Quat::IDENTITY,
            scale: Vec3::ONE,
            rotation: Vec3::ZERO,
            up: Vec3::Y,
            drawable: None,
        }
    }
}

/// A cheaply clonable handle to a node of the scene graph.
///
/// All clones refer to the same underlying [`SceneNodeData`]. Parent
/// links are weak, so dropping every handle to a subtree frees it even
/// though children point back at their parent.
#[derive(Clone)]
pub struct SceneNode {
    data: Rc<RefCell<SceneNodeData>>,
}

impl SceneNode {
    /// Creates a detached grouping node with an identity transform.
    pub fn new() -> SceneNode {
        SceneNode {
            data: Rc::new(RefCell::new(SceneNodeData::default())),
        }
    }

    /// Creates a detached node that draws `mesh`.
    pub fn with_drawable(mesh: Mesh) -> SceneNode {
        let node = SceneNode::new();
        node.data_mut().drawable = Some(mesh);
        node
    }

    pub fn data(&self) -> Ref<SceneNodeData> {
        self.data.borrow()
    }

    pub fn data_mut(&self) -> RefMut<SceneNodeData> {
        self.data.borrow_mut()
    }

    /// Re-parents this node, detaching it from its current parent first.
    /// `None` detaches without re-attaching.
    pub fn set_parent(&self, parent: Option<&SceneNode>) {
        self.set_parent_impl(parent, true);
    }

    fn set_parent_impl(&self, parent: Option<&SceneNode>, notify: bool) {
        let previous = self
            .data()
            .parent
            .as_ref()
            .and_then(|parent| parent.upgrade());
        if let Some(previous) = previous {
            let unchanged = parent.map_or(false, |parent| Rc::ptr_eq(&parent.data, &previous));
            if !unchanged {
                previous.borrow_mut().unlink_child(&self.data);
            }
        }

        self.data_mut().parent = parent.map(|parent| Rc::downgrade(&parent.data));
        if notify {
            if let Some(parent) = parent {
                parent.add_child_impl(self, false);
            }
        }
    }

    /// Adds `child` under this node. A node is never added twice.
    pub fn add_child(&self, child: &SceneNode) {
        self.add_child_impl(child, true);
    }

    fn add_child_impl(&self, child: &SceneNode, notify: bool) {
        let already_present = self
            .data()
            .children
            .iter()
            .any(|other| Rc::ptr_eq(&other.data, &child.data));
        if !already_present {
            self.data_mut().children.push(child.clone());
        }
        if notify {
            child.set_parent_impl(Some(self), false);
        }
    }

    /// Removes `child` from this node's children, if present.
    pub fn remove_child(&self, child: &SceneNode) {
        self.data_mut().unlink_child(&child.data);
        child.data_mut().parent = None;
    }

    /// Walks the subtree depth-first, this node included. Returning
    /// `true` from the callback prunes the node's children.
    pub fn traverse<F: FnMut(&SceneNode) -> bool>(&self, f: &mut F) {
        if f(self) {
            return;
        }
        // Children are snapshotted so the callback may borrow node data.
        let children: Vec<SceneNode> = self.data().children.clone();
        for child in &children {
            child.traverse(f);
        }
    }

    /// Recomputes world matrices for this node and its whole subtree.
    ///
    /// A node whose local matrix changed is recomposed against the
    /// parent's current world matrix, and the change cascades to every
    /// descendant; untouched branches are left alone.
    pub fn update_matrix_world(&self) {
        let parent_world = self
            .data()
            .parent
            .as_ref()
            .and_then(|parent| parent.upgrade())
            .map(|parent| parent.borrow().world_matrix);
        self.data_mut().propagate_world_matrix(parent_world, false);
    }

    pub fn set_position(&self, position: Vec3) {
        self.data_mut().position = position;
    }

    pub fn set_scale(&self, scale: Vec3) {
        self.data_mut().scale = scale;
    }

    pub fn set_visible(&self, visible: bool) {
        self.data_mut().visible = visible;
    }

    /// See [`SceneNodeData::look_at`]. Objects look down their positive
    /// side towards the target.
    pub fn look_at(&self, target: Vec3) {
        self.data_mut().look_at(target, false);
    }
}

impl Default for SceneNode {
    fn default() -> SceneNode {
        SceneNode::new()
    }
}
