use scene::color::Color;
use scene::graph::PointsStyle;
use scene::prefabs::{AtmosphereDesc, CloudsDesc, GlobeSceneDesc, LightDesc};
use serde::{Deserialize, Serialize};

use crate::error::GlobeError;

pub const MAX_LEVEL_OF_DETAIL: u8 = 3;

/// Globe configuration captured at initialize time.
///
/// Colors stay as hex strings so hosts can pass the struct across a JSON
/// boundary unchanged; [`GlobeOptions::validate`] parses them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobeOptions {
    pub width: u32,
    pub height: u32,
    pub background_color: String,

    pub atmosphere_color: String,
    pub atmosphere_opacity: f64,
    pub enable_atmosphere_glow: bool,

    pub participant_point_size: f64,
    pub participant_point_color: String,
    pub highlighted_point_color: String,

    pub auto_rotate: bool,
    pub auto_rotate_speed: f64,
    pub enable_mouse_controls: bool,
    pub enable_zoom: bool,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub level_of_detail: u8,

    pub earth_texture_url: Option<String>,
    pub normal_texture_url: Option<String>,
    pub specular_texture_url: Option<String>,
    pub clouds_texture_url: Option<String>,
    pub enable_clouds: bool,
    pub clouds_opacity: f64,
    pub clouds_speed: f64,

    pub country_point_color: String,
    pub country_point_size: f64,
    pub country_line_color: String,
    pub country_line_width: f64,

    pub sun_light_intensity: f64,
    pub sun_light_color: String,
    pub ambient_light_intensity: f64,
    pub ambient_light_color: String,
    pub atmosphere_light_intensity: f64,
    pub atmosphere_light_color: String,
}

impl Default for GlobeOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            background_color: "#000011".into(),
            atmosphere_color: "#00aaff".into(),
            atmosphere_opacity: 0.2,
            enable_atmosphere_glow: true,
            participant_point_size: 0.5,
            participant_point_color: "#ffff00".into(),
            highlighted_point_color: "#ff6600".into(),
            auto_rotate: true,
            auto_rotate_speed: 0.1,
            enable_mouse_controls: true,
            enable_zoom: true,
            min_zoom: 0.5,
            max_zoom: 4.0,
            level_of_detail: 2,
            earth_texture_url: None,
            normal_texture_url: None,
            specular_texture_url: None,
            clouds_texture_url: None,
            enable_clouds: true,
            clouds_opacity: 0.1,
            clouds_speed: 0.01,
            country_point_color: "#ffffff".into(),
            country_point_size: 0.1,
            country_line_color: "#444444".into(),
            country_line_width: 0.5,
            sun_light_intensity: 3.0,
            sun_light_color: "#ffffff".into(),
            ambient_light_intensity: 3.0,
            ambient_light_color: "#404040".into(),
            atmosphere_light_intensity: 1.0,
            atmosphere_light_color: "#00aaff".into(),
        }
    }
}

impl GlobeOptions {
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Checks every numeric range and parses every color.
    pub fn validate(&self) -> Result<(), GlobeError> {
        self.scene_desc().map(|_| ())
    }

    /// Validates and converts into the scene description used to build the
    /// globe. The first failing field is reported.
    pub fn scene_desc(&self) -> Result<GlobeSceneDesc, GlobeError> {
        if self.width == 0 {
            return Err(GlobeError::validation("width", "must be positive"));
        }
        if self.height == 0 {
            return Err(GlobeError::validation("height", "must be positive"));
        }
        if !(self.min_zoom.is_finite() && self.min_zoom > 0.0) {
            return Err(GlobeError::validation("minZoom", "must be a positive number"));
        }
        if !(self.max_zoom.is_finite() && self.max_zoom > self.min_zoom) {
            return Err(GlobeError::validation("maxZoom", "must be greater than minZoom"));
        }
        if self.level_of_detail > MAX_LEVEL_OF_DETAIL {
            return Err(GlobeError::validation(
                "levelOfDetail",
                format!("must be between 0 and {MAX_LEVEL_OF_DETAIL}"),
            ));
        }

        for (field, value) in [
            ("atmosphereOpacity", self.atmosphere_opacity),
            ("cloudsOpacity", self.clouds_opacity),
        ] {
            check_unit(field, value)?;
        }
        for (field, value) in [
            ("autoRotateSpeed", self.auto_rotate_speed),
            ("cloudsSpeed", self.clouds_speed),
            ("participantPointSize", self.participant_point_size),
            ("countryPointSize", self.country_point_size),
            ("countryLineWidth", self.country_line_width),
            ("sunLightIntensity", self.sun_light_intensity),
            ("ambientLightIntensity", self.ambient_light_intensity),
            ("atmosphereLightIntensity", self.atmosphere_light_intensity),
        ] {
            check_non_negative(field, value)?;
        }

        let background = parse_color("backgroundColor", &self.background_color)?;
        let atmosphere = parse_color("atmosphereColor", &self.atmosphere_color)?;
        let point = parse_color("participantPointColor", &self.participant_point_color)?;
        let highlight = parse_color("highlightedPointColor", &self.highlighted_point_color)?;
        parse_color("countryPointColor", &self.country_point_color)?;
        parse_color("countryLineColor", &self.country_line_color)?;
        let sun = parse_color("sunLightColor", &self.sun_light_color)?;
        let ambient = parse_color("ambientLightColor", &self.ambient_light_color)?;
        let atmosphere_light = parse_color("atmosphereLightColor", &self.atmosphere_light_color)?;

        let clouds = match (&self.clouds_texture_url, self.enable_clouds) {
            (Some(url), true) => Some(CloudsDesc {
                texture_url: url.clone(),
                opacity: self.clouds_opacity,
            }),
            _ => None,
        };

        Ok(GlobeSceneDesc {
            background,
            level_of_detail: self.level_of_detail,
            earth_texture_url: self.earth_texture_url.clone(),
            normal_texture_url: self.normal_texture_url.clone(),
            specular_texture_url: self.specular_texture_url.clone(),
            atmosphere: self.enable_atmosphere_glow.then_some(AtmosphereDesc {
                color: atmosphere,
                opacity: self.atmosphere_opacity,
            }),
            clouds,
            points: PointsStyle {
                size: self.participant_point_size,
                color: point,
                highlight,
                radius: scene::point_cloud::POINT_RENDER_RADIUS,
            },
            sun: LightDesc {
                color: sun,
                intensity: self.sun_light_intensity,
            },
            ambient: LightDesc {
                color: ambient,
                intensity: self.ambient_light_intensity,
            },
            atmosphere_light: LightDesc {
                color: atmosphere_light,
                intensity: self.atmosphere_light_intensity,
            },
        })
    }
}

fn parse_color(field: &str, value: &str) -> Result<Color, GlobeError> {
    value
        .parse()
        .map_err(|e: scene::color::ColorParseError| GlobeError::validation(field, e.to_string()))
}

fn check_unit(field: &str, value: f64) -> Result<(), GlobeError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GlobeError::validation(field, "must be between 0 and 1"))
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<(), GlobeError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GlobeError::validation(field, "must be a finite, non-negative number"))
    }
}

#[cfg(test)]
mod tests {
    use super::GlobeOptions;
    use crate::error::GlobeError;
    use pretty_assertions::assert_eq;

    fn field_of(err: GlobeError) -> String {
        match err {
            GlobeError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        let options = GlobeOptions::default();
        options.validate().unwrap();
        let desc = options.scene_desc().unwrap();
        assert!(desc.atmosphere.is_some());
        // No cloud texture configured, so no cloud shell.
        assert!(desc.clouds.is_none());
    }

    #[test]
    fn rejects_bad_ranges() {
        let cases: [(&str, fn(&mut GlobeOptions)); 8] = [
            ("width", |o: &mut GlobeOptions| o.width = 0),
            ("minZoom", |o: &mut GlobeOptions| o.min_zoom = 0.0),
            ("maxZoom", |o: &mut GlobeOptions| o.max_zoom = o.min_zoom),
            ("levelOfDetail", |o: &mut GlobeOptions| o.level_of_detail = 4),
            ("atmosphereOpacity", |o: &mut GlobeOptions| o.atmosphere_opacity = 1.5),
            ("cloudsSpeed", |o: &mut GlobeOptions| o.clouds_speed = f64::NAN),
            ("autoRotateSpeed", |o: &mut GlobeOptions| o.auto_rotate_speed = -1.0),
            ("sunLightColor", |o: &mut GlobeOptions| o.sun_light_color = "sun".into()),
        ];
        for (field, mutate) in cases {
            let mut options = GlobeOptions::default();
            mutate(&mut options);
            assert_eq!(field_of(options.validate().unwrap_err()), field);
        }
    }

    #[test]
    fn deserializes_partial_camel_case() {
        let options: GlobeOptions =
            serde_json::from_str(r#"{"width":1024,"height":768,"levelOfDetail":3}"#).unwrap();
        assert_eq!(options.width, 1024);
        assert_eq!(options.level_of_detail, 3);
        assert_eq!(options.background_color, "#000011");

        let json = serde_json::to_value(GlobeOptions::default()).unwrap();
        assert_eq!(json["autoRotateSpeed"], 0.1);
    }

    #[test]
    fn clouds_need_texture_and_flag() {
        let mut options = GlobeOptions {
            clouds_texture_url: Some("clouds.jpg".into()),
            ..GlobeOptions::default()
        };
        assert!(options.scene_desc().unwrap().clouds.is_some());
        options.enable_clouds = false;
        assert!(options.scene_desc().unwrap().clouds.is_none());
    }

    #[test]
    fn zoom_is_clamped() {
        let options = GlobeOptions::default();
        assert_eq!(options.clamp_zoom(10.0), 4.0);
        assert_eq!(options.clamp_zoom(0.1), 0.5);
        assert_eq!(options.clamp_zoom(2.0), 2.0);
    }
}
