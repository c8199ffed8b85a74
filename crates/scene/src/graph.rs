use foundation::math::Vec3;

use crate::color::Color;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SphereRole {
    Earth,
    Atmosphere,
    Clouds,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Color,
    Normal,
    Specular,
    Clouds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRef {
    pub slot: TextureSlot,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SphereMesh {
    pub role: SphereRole,
    pub radius: f64,
    pub segments: u32,
    pub color: Color,
    pub opacity: f64,
    pub textures: Vec<TextureRef>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LightKind {
    Sun,
    Ambient,
    Atmosphere,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f64,
    /// Ignored for ambient lights.
    pub position: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointsStyle {
    pub size: f64,
    pub color: Color,
    pub highlight: Color,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Sphere(SphereMesh),
    Light(Light),
    Points(PointsStyle),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub rotation_y: f64,
}

/// Flat scene graph. Slots are never reused, so a stale [`NodeId`] simply
/// resolves to `None` after removal.
#[derive(Debug, Default, Clone)]
pub struct SceneGraph {
    nodes: Vec<Option<SceneNode>>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(SceneNode {
            kind,
            parent,
            rotation_y: 0.0,
        }));
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.index()).and_then(|n| n.as_ref())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.index()).and_then(|n| n.as_mut())
    }

    /// Removes `id` and every node below it. Returns the number removed.
    pub fn remove(&mut self, id: NodeId) -> usize {
        if self.node(id).is_none() {
            return 0;
        }
        let children: Vec<NodeId> = self
            .iter()
            .filter(|(_, n)| n.parent == Some(id))
            .map(|(child, _)| child)
            .collect();

        let mut removed = 1;
        for child in children {
            removed += self.remove(child);
        }
        self.nodes[id.index()] = None;
        removed
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, n)| n.as_ref().map(|n| (NodeId(idx as u32), n)))
    }

    pub fn find_sphere(&self, role: SphereRole) -> Option<NodeId> {
        self.iter().find_map(|(id, n)| match &n.kind {
            NodeKind::Sphere(mesh) if mesh.role == role => Some(id),
            _ => None,
        })
    }

    pub fn find_light(&self, kind: LightKind) -> Option<NodeId> {
        self.iter().find_map(|(id, n)| match &n.kind {
            NodeKind::Light(light) if light.kind == kind => Some(id),
            _ => None,
        })
    }

    /// Accumulated Y rotation from `id` up to the root.
    pub fn world_rotation_y(&self, id: NodeId) -> f64 {
        let mut total = 0.0;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(node) = self.node(current) else {
                break;
            };
            total += node.rotation_y;
            cursor = node.parent;
        }
        total
    }

    /// Every texture referenced by a sphere, in node order.
    pub fn textures(&self) -> Vec<&TextureRef> {
        self.iter()
            .filter_map(|(_, n)| match &n.kind {
                NodeKind::Sphere(mesh) => Some(mesh.textures.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}
