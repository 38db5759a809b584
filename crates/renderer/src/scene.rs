use anyhow::Result;

use crate::breathing::BreathingScene;
use crate::camera::Backdrop;
use crate::gpu::FlowUniforms;
use crate::gradient::FlowGradient;
use crate::touch::{TouchPoint, TouchTexture};
use crate::types::{RendererConfig, Scene};

/// The scene the frame loop drives, selected once at start-up.
#[derive(Debug, Clone)]
pub enum GradientScene {
    Flow(FlowGradient),
    Breathing(BreathingScene),
}

impl GradientScene {
    pub fn from_config(config: &RendererConfig, width: u32, height: u32) -> Result<Self> {
        Ok(match config.scene {
            Scene::Flow => GradientScene::Flow(FlowGradient::new(config.flow.clone(), width, height)),
            Scene::Breathing => GradientScene::Breathing(BreathingScene::new(
                config.breathing.clone(),
                width,
                height,
            )?),
        })
    }

    pub fn kind(&self) -> Scene {
        match self {
            GradientScene::Flow(_) => Scene::Flow,
            GradientScene::Breathing(_) => Scene::Breathing,
        }
    }

    /// Pointer samples only affect the flow scene.
    pub fn add_touch(&mut self, point: TouchPoint) {
        if let GradientScene::Flow(gradient) = self {
            gradient.add_touch(point);
        }
    }

    pub fn tick(&mut self, real_dt: f32) -> f32 {
        match self {
            GradientScene::Flow(gradient) => gradient.tick(real_dt),
            GradientScene::Breathing(scene) => scene.tick(real_dt),
        }
    }

    pub fn seek(&mut self, seconds: f32) {
        match self {
            GradientScene::Flow(gradient) => gradient.seek(seconds),
            GradientScene::Breathing(scene) => scene.seek(seconds),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        match self {
            GradientScene::Flow(gradient) => gradient.resize(width, height),
            GradientScene::Breathing(scene) => scene.resize(width, height),
        }
    }

    pub fn time(&self) -> f32 {
        match self {
            GradientScene::Flow(gradient) => gradient.time(),
            GradientScene::Breathing(scene) => scene.time(),
        }
    }

    pub fn backdrop(&self) -> &Backdrop {
        match self {
            GradientScene::Flow(gradient) => gradient.backdrop(),
            GradientScene::Breathing(scene) => scene.backdrop(),
        }
    }

    pub fn touch(&self) -> Option<&TouchTexture> {
        match self {
            GradientScene::Flow(gradient) => Some(gradient.touch()),
            GradientScene::Breathing(_) => None,
        }
    }

    pub(crate) fn touch_mut(&mut self) -> Option<&mut TouchTexture> {
        match self {
            GradientScene::Flow(gradient) => Some(gradient.touch_mut()),
            GradientScene::Breathing(_) => None,
        }
    }

    pub(crate) fn uniforms(&self) -> &FlowUniforms {
        match self {
            GradientScene::Flow(gradient) => gradient.uniforms(),
            GradientScene::Breathing(scene) => scene.uniforms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breathing_scene_ignores_touches() {
        let config = RendererConfig {
            scene: Scene::Breathing,
            ..RendererConfig::default()
        };
        let mut scene = GradientScene::from_config(&config, 320, 240).expect("scene");
        scene.add_touch(TouchPoint::new(0.1, 0.1));
        assert!(scene.touch().is_none());
        assert_eq!(scene.kind(), Scene::Breathing);
    }

    #[test]
    fn flow_scene_forwards_touches() {
        let mut scene =
            GradientScene::from_config(&RendererConfig::default(), 320, 240).expect("scene");
        scene.add_touch(TouchPoint::new(0.1, 0.1));
        scene.add_touch(TouchPoint::new(0.2, 0.1));
        assert_eq!(scene.touch().map(|touch| touch.trail().len()), Some(2));
        scene.resize(640, 480);
        assert_eq!(scene.uniforms().resolution(), (640.0, 480.0));
    }
}
