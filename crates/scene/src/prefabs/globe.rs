use foundation::math::Vec3;

use crate::color::Color;
use crate::graph::{
    Light, LightKind, NodeId, NodeKind, PointsStyle, SceneGraph, SphereMesh, SphereRole,
    TextureRef, TextureSlot,
};
use crate::point_cloud::POINT_RENDER_RADIUS;

pub const EARTH_RADIUS: f64 = 1.0;
pub const CLOUDS_RADIUS: f64 = 1.01;
pub const ATMOSPHERE_RADIUS: f64 = 1.05;

/// Sphere segment counts for levels of detail 0..=3.
pub const LOD_SEGMENTS: [u32; 4] = [16, 32, 64, 128];

pub const SUN_POSITION: Vec3 = Vec3::new(5.0, 3.0, 5.0);
pub const ATMOSPHERE_LIGHT_POSITION: Vec3 = Vec3::new(0.0, 0.0, 3.0);

/// Segment count for `lod`; levels above the table use the finest entry.
pub fn lod_segments(lod: u8) -> u32 {
    let idx = (lod as usize).min(LOD_SEGMENTS.len() - 1);
    LOD_SEGMENTS[idx]
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtmosphereDesc {
    pub color: Color,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloudsDesc {
    pub texture_url: String,
    pub opacity: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightDesc {
    pub color: Color,
    pub intensity: f64,
}

/// Everything needed to assemble the globe scene, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeSceneDesc {
    pub background: Color,
    pub level_of_detail: u8,
    pub earth_texture_url: Option<String>,
    pub normal_texture_url: Option<String>,
    pub specular_texture_url: Option<String>,
    pub atmosphere: Option<AtmosphereDesc>,
    pub clouds: Option<CloudsDesc>,
    pub points: PointsStyle,
    pub sun: LightDesc,
    pub ambient: LightDesc,
    pub atmosphere_light: LightDesc,
}

/// Assembled globe scene with handles to the nodes the runtime animates.
#[derive(Debug, Clone)]
pub struct GlobeScene {
    pub graph: SceneGraph,
    pub background: Color,
    pub earth_group: NodeId,
    pub earth: NodeId,
    pub clouds: Option<NodeId>,
    pub points: NodeId,
}

/// Builds the globe: a rotating earth group holding the earth sphere, the
/// optional atmosphere and cloud shells and the participant points, plus
/// scene-level sun, ambient and atmosphere lights.
pub fn build_globe_scene(desc: &GlobeSceneDesc) -> GlobeScene {
    let mut graph = SceneGraph::new();
    let earth_group = graph.spawn(NodeKind::Group, None);
    let segments = lod_segments(desc.level_of_detail);

    let earth_textures = [
        (TextureSlot::Color, &desc.earth_texture_url),
        (TextureSlot::Normal, &desc.normal_texture_url),
        (TextureSlot::Specular, &desc.specular_texture_url),
    ]
    .into_iter()
    .filter_map(|(slot, url)| {
        url.as_ref().map(|url| TextureRef {
            slot,
            url: url.clone(),
        })
    })
    .collect();

    let earth = graph.spawn(
        NodeKind::Sphere(SphereMesh {
            role: SphereRole::Earth,
            radius: EARTH_RADIUS,
            segments,
            color: Color::WHITE,
            opacity: 1.0,
            textures: earth_textures,
        }),
        Some(earth_group),
    );

    if let Some(atmosphere) = &desc.atmosphere {
        graph.spawn(
            NodeKind::Sphere(SphereMesh {
                role: SphereRole::Atmosphere,
                radius: ATMOSPHERE_RADIUS,
                segments,
                color: atmosphere.color,
                opacity: atmosphere.opacity,
                textures: Vec::new(),
            }),
            Some(earth_group),
        );
    }

    let clouds = desc.clouds.as_ref().map(|clouds| {
        graph.spawn(
            NodeKind::Sphere(SphereMesh {
                role: SphereRole::Clouds,
                radius: CLOUDS_RADIUS,
                segments,
                color: Color::WHITE,
                opacity: clouds.opacity,
                textures: vec![TextureRef {
                    slot: TextureSlot::Clouds,
                    url: clouds.texture_url.clone(),
                }],
            }),
            Some(earth_group),
        )
    });

    let points = graph.spawn(
        NodeKind::Points(PointsStyle {
            radius: POINT_RENDER_RADIUS,
            ..desc.points
        }),
        Some(earth_group),
    );

    let lights = [
        (LightKind::Sun, desc.sun, SUN_POSITION),
        (LightKind::Ambient, desc.ambient, Vec3::ZERO),
        (
            LightKind::Atmosphere,
            desc.atmosphere_light,
            ATMOSPHERE_LIGHT_POSITION,
        ),
    ];
    for (kind, light, position) in lights {
        graph.spawn(
            NodeKind::Light(Light {
                kind,
                color: light.color,
                intensity: light.intensity,
                position,
            }),
            None,
        );
    }

    GlobeScene {
        graph,
        background: desc.background,
        earth_group,
        earth,
        clouds,
        points,
    }
}

impl GlobeScene {
    /// Re-tessellates every sphere for `lod`.
    pub fn set_level_of_detail(&mut self, lod: u8) {
        let segments = lod_segments(lod);
        let ids: Vec<NodeId> = self.graph.iter().map(|(id, _)| id).collect();
        for id in ids {
            if let Some(node) = self.graph.node_mut(id) {
                if let NodeKind::Sphere(mesh) = &mut node.kind {
                    mesh.segments = segments;
                }
            }
        }
    }

    pub fn earth_rotation(&self) -> f64 {
        self.rotation_of(self.earth_group)
    }

    pub fn set_earth_rotation(&mut self, radians: f64) {
        if let Some(node) = self.graph.node_mut(self.earth_group) {
            node.rotation_y = radians;
        }
    }

    pub fn cloud_rotation(&self) -> f64 {
        self.clouds.map(|id| self.rotation_of(id)).unwrap_or(0.0)
    }

    /// No-op when the scene was built without clouds.
    pub fn set_cloud_rotation(&mut self, radians: f64) {
        let Some(id) = self.clouds else { return };
        if let Some(node) = self.graph.node_mut(id) {
            node.rotation_y = radians;
        }
    }

    pub fn points_style(&self) -> Option<PointsStyle> {
        match self.graph.node(self.points).map(|n| &n.kind) {
            Some(NodeKind::Points(style)) => Some(*style),
            _ => None,
        }
    }

    pub fn light(&self, kind: LightKind) -> Option<Light> {
        let id = self.graph.find_light(kind)?;
        match self.graph.node(id).map(|n| &n.kind) {
            Some(NodeKind::Light(light)) => Some(*light),
            _ => None,
        }
    }

    /// Returns `false` if the scene has no light of that kind.
    pub fn set_light_intensity(&mut self, kind: LightKind, intensity: f64) -> bool {
        let Some(id) = self.graph.find_light(kind) else {
            return false;
        };
        match self.graph.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Light(light)) => {
                light.intensity = intensity;
                true
            }
            _ => false,
        }
    }

    fn rotation_of(&self, id: NodeId) -> f64 {
        self.graph.node(id).map(|n| n.rotation_y).unwrap_or(0.0)
    }
}
