//! Drawable templates: which mesh is drawn and which nodes move it.

use crate::graph::armature::ArmatureTemplate;
use crate::graph::instance::ArmatureInstance;
use crate::transform::{MeshTransform, RigidTransform, SkinnedTransform};
use crate::util::{Error, Mat4, Result};

/// Mesh attached to a single node and moved as a rigid body.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidDrawableTemplate {
    pub name: String,
    pub mesh: usize,
    pub node: usize,
}

/// One joint of a skin: the node driving it and its inverse bind matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkinJoint {
    pub node: usize,
    pub inverse_bind: Mat4,
}

impl SkinJoint {
    pub fn new(node: usize, inverse_bind: Mat4) -> Self {
        Self { node, inverse_bind }
    }
}

/// Mesh deformed by a set of joints.
#[derive(Clone, Debug, PartialEq)]
pub struct SkinnedDrawableTemplate {
    pub name: String,
    pub mesh: usize,
    /// Name of the node the skinned mesh hangs off in the source asset.
    pub owner_node: String,
    pub joints: Vec<SkinJoint>,
}

/// Static binding of a mesh to armature nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawableTemplate {
    Rigid(RigidDrawableTemplate),
    Skinned(SkinnedDrawableTemplate),
}

impl DrawableTemplate {
    pub fn rigid(name: impl Into<String>, mesh: usize, node: usize) -> Self {
        Self::Rigid(RigidDrawableTemplate {
            name: name.into(),
            mesh,
            node,
        })
    }

    pub fn skinned(
        name: impl Into<String>,
        mesh: usize,
        owner_node: impl Into<String>,
        joints: Vec<SkinJoint>,
    ) -> Self {
        Self::Skinned(SkinnedDrawableTemplate {
            name: name.into(),
            mesh,
            owner_node: owner_node.into(),
            joints,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        match self {
            Self::Rigid(d) => &d.name,
            Self::Skinned(d) => &d.name,
        }
    }

    #[inline]
    pub fn mesh_index(&self) -> usize {
        match self {
            Self::Rigid(d) => d.mesh,
            Self::Skinned(d) => d.mesh,
        }
    }

    #[inline]
    pub fn is_skinned(&self) -> bool {
        matches!(self, Self::Skinned(_))
    }

    /// Check every node reference against `armature`.
    pub fn validate(&self, armature: &ArmatureTemplate) -> Result<()> {
        let count = armature.len();
        match self {
            Self::Rigid(d) if d.node >= count => Err(Error::missing(format!(
                "drawable '{}' is attached to node {} but the armature has {count} nodes",
                d.name, d.node
            ))),
            Self::Rigid(_) => Ok(()),
            Self::Skinned(d) => {
                if let Some(j) = d.joints.iter().find(|j| j.node >= count) {
                    return Err(Error::missing(format!(
                        "skin '{}' uses joint node {} but the armature has {count} nodes",
                        d.name, j.node
                    )));
                }
                if armature.node_index(&d.owner_node).is_none() {
                    return Err(Error::missing(format!(
                        "skin '{}' is owned by unknown node '{}'",
                        d.name, d.owner_node
                    )));
                }
                Ok(())
            }
        }
    }

    /// Fresh transform of the matching kind.
    pub fn create_transform(&self) -> MeshTransform {
        match self {
            Self::Rigid(_) => MeshTransform::Rigid(RigidTransform::new()),
            Self::Skinned(_) => MeshTransform::Skinned(SkinnedTransform::new()),
        }
    }

    /// Refresh `transform` from the armature's current pose.
    ///
    /// Rigid drawables get `world * model(node)`. Skinned drawables get one
    /// `model(joint) * inverse_bind` per joint; the instance world matrix is
    /// applied by the effect.
    pub fn update_transform(&self, armature: &ArmatureInstance, world: Mat4, transform: &mut MeshTransform) {
        if self.is_skinned() != transform.as_skinned().is_some() {
            *transform = self.create_transform();
        }
        match (self, transform) {
            (Self::Rigid(d), MeshTransform::Rigid(t)) => {
                t.update(world * armature.model_matrix(d.node));
            }
            (Self::Skinned(d), MeshTransform::Skinned(t)) => {
                t.update(
                    d.joints.len(),
                    |j| d.joints[j].inverse_bind,
                    |j| armature.model_matrix(d.joints[j].node),
                );
            }
            _ => {}
        }
    }
}

/// Live view of one drawable in a model instance.
#[derive(Clone, Copy, Debug)]
pub struct DrawableInstance<'a> {
    pub template: &'a DrawableTemplate,
    pub transform: &'a MeshTransform,
}

impl DrawableInstance<'_> {
    #[inline]
    pub fn mesh_index(&self) -> usize {
        self.template.mesh_index()
    }

    #[inline]
    pub fn visible(&self) -> bool {
        self.transform.visible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::armature::ArmatureBuilder;
    use crate::util::Vec3;
    use std::sync::Arc;

    fn two_bones() -> Arc<ArmatureTemplate> {
        let mut b = ArmatureBuilder::new();
        let root = b.add_node("root", None).unwrap();
        let bone = b.add_node("bone", Some(root)).unwrap();
        b.set_local_matrix(bone, Mat4::from_translation(Vec3::Y)).unwrap();
        Arc::new(b.build().unwrap())
    }

    #[test]
    fn test_validate_references() {
        let arm = two_bones();
        assert!(DrawableTemplate::rigid("ok", 0, 1).validate(&arm).is_ok());
        assert!(matches!(
            DrawableTemplate::rigid("bad", 0, 2).validate(&arm),
            Err(Error::MissingReference(_))
        ));

        let joints = vec![SkinJoint::new(0, Mat4::IDENTITY), SkinJoint::new(4, Mat4::IDENTITY)];
        assert!(matches!(
            DrawableTemplate::skinned("skin", 0, "root", joints).validate(&arm),
            Err(Error::MissingReference(_))
        ));
        let joints = vec![SkinJoint::new(1, Mat4::IDENTITY)];
        assert!(matches!(
            DrawableTemplate::skinned("skin", 0, "nobody", joints).validate(&arm),
            Err(Error::MissingReference(_))
        ));
    }

    #[test]
    fn test_rigid_update_applies_world() {
        let arm = ArmatureInstance::new(two_bones());
        let d = DrawableTemplate::rigid("box", 0, 1);
        let mut t = d.create_transform();
        let world = Mat4::from_translation(Vec3::X);
        d.update_transform(&arm, world, &mut t);
        let rigid = t.as_rigid().unwrap();
        assert!(rigid.world_matrix().abs_diff_eq(Mat4::from_translation(Vec3::new(1.0, 1.0, 0.0)), 1e-6));
    }

    #[test]
    fn test_skinned_update_uses_inverse_bind() {
        let arm = ArmatureInstance::new(two_bones());
        let bind = Mat4::from_translation(Vec3::Y);
        let d = DrawableTemplate::skinned("skin", 0, "root", vec![SkinJoint::new(1, bind.inverse())]);
        let mut t = d.create_transform();
        d.update_transform(&arm, Mat4::IDENTITY, &mut t);
        let skinned = t.as_skinned().unwrap();
        assert_eq!(skinned.joint_count(), 1);
        // Bone still sits at its bind pose.
        assert!(skinned.joint_matrices()[0].abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn test_kind_mismatch_recreates_transform() {
        let arm = ArmatureInstance::new(two_bones());
        let d = DrawableTemplate::rigid("box", 0, 0);
        let mut t = MeshTransform::Skinned(SkinnedTransform::new());
        d.update_transform(&arm, Mat4::IDENTITY, &mut t);
        assert!(t.as_rigid().is_some());
    }
}
