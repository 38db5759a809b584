//! Perspective camera and the backdrop plane it looks at.
//!
//! The plane is sized to exactly fill the camera's view at its distance, so
//! the fragment program covers the whole surface with UVs running 0..1.

use bytemuck::{Pod, Zeroable};

pub const FIELD_OF_VIEW_DEGREES: f32 = 45.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 10_000.0;
pub const CAMERA_DISTANCE: f32 = 50.0;
/// Plane size used when the camera produces a degenerate view.
pub const FALLBACK_VIEW_SIZE: ViewSize = ViewSize {
    width: 100.0,
    height: 100.0,
};

pub type Mat4 = [[f32; 4]; 4];

/// World-space extent visible at the camera's distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub distance: f32,
}

impl PerspectiveCamera {
    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = Self {
            fov_degrees: FIELD_OF_VIEW_DEGREES,
            aspect: 1.0,
            near: NEAR_PLANE,
            far: FAR_PLANE,
            distance: CAMERA_DISTANCE,
        };
        camera.set_aspect(width, height);
        camera
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    /// Visible plane size, or [`FALLBACK_VIEW_SIZE`] when either side would be
    /// zero or non-finite.
    pub fn view_size(&self) -> ViewSize {
        let height = (self.distance * (self.fov_degrees.to_radians() * 0.5).tan() * 2.0).abs();
        let width = height * self.aspect;
        let usable = |v: f32| v.is_finite() && v != 0.0;
        if usable(width) && usable(height) {
            ViewSize { width, height }
        } else {
            FALLBACK_VIEW_SIZE
        }
    }

    /// Column-major projection with a 0..1 depth range.
    pub fn projection(&self) -> Mat4 {
        let aspect = if self.aspect.is_finite() && self.aspect > 0.0 {
            self.aspect
        } else {
            1.0
        };
        let f = 1.0 / (self.fov_degrees.to_radians() * 0.5).tan();
        let range = self.near - self.far;
        [
            [f / aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, self.far / range, -1.0],
            [0.0, 0.0, self.near * self.far / range, 0.0],
        ]
    }

    /// Projection times a view that backs the camera off along +z.
    pub fn view_projection(&self) -> Mat4 {
        let mut matrix = self.projection();
        for row in 0..4 {
            matrix[3][row] -= self.distance * matrix[2][row];
        }
        matrix
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PlaneVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

pub const PLANE_INDICES: [u16; 6] = [0, 2, 1, 2, 3, 1];

/// Four-vertex quad centered on the origin in the z = 0 plane.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneGeometry {
    size: ViewSize,
    vertices: [PlaneVertex; 4],
}

impl PlaneGeometry {
    pub fn new(size: ViewSize) -> Self {
        let hw = size.width * 0.5;
        let hh = size.height * 0.5;
        let vertices = [
            PlaneVertex {
                position: [-hw, hh, 0.0],
                uv: [0.0, 1.0],
            },
            PlaneVertex {
                position: [hw, hh, 0.0],
                uv: [1.0, 1.0],
            },
            PlaneVertex {
                position: [-hw, -hh, 0.0],
                uv: [0.0, 0.0],
            },
            PlaneVertex {
                position: [hw, -hh, 0.0],
                uv: [1.0, 0.0],
            },
        ];
        Self { size, vertices }
    }

    pub fn size(&self) -> ViewSize {
        self.size
    }

    pub fn vertices(&self) -> &[PlaneVertex; 4] {
        &self.vertices
    }
}

/// Camera, plane and surface resolution shared by every scene.
///
/// The generation counter bumps whenever the plane is rebuilt so the GPU side
/// knows its vertex buffer is stale.
#[derive(Debug, Clone)]
pub struct Backdrop {
    camera: PerspectiveCamera,
    plane: PlaneGeometry,
    resolution: (u32, u32),
    generation: u64,
}

impl Backdrop {
    pub fn new(width: u32, height: u32) -> Self {
        let camera = PerspectiveCamera::new(width, height);
        let plane = PlaneGeometry::new(camera.view_size());
        Self {
            camera,
            plane,
            resolution: (width, height),
            generation: 0,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
        self.plane = PlaneGeometry::new(self.camera.view_size());
        self.resolution = (width, height);
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn plane(&self) -> &PlaneGeometry {
        &self.plane
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform(matrix: &Mat4, point: [f32; 3]) -> [f32; 3] {
        let mut out = [0.0; 4];
        for (row, value) in out.iter_mut().enumerate() {
            *value = matrix[0][row] * point[0]
                + matrix[1][row] * point[1]
                + matrix[2][row] * point[2]
                + matrix[3][row];
        }
        [out[0] / out[3], out[1] / out[3], out[2] / out[3]]
    }

    #[test]
    fn view_size_tracks_aspect() {
        let camera = PerspectiveCamera::new(1600, 900);
        let size = camera.view_size();
        let expected_height = 2.0 * 50.0 * (22.5f32).to_radians().tan();
        assert!((size.height - expected_height).abs() < 1e-4);
        assert!((size.width / size.height - 1600.0 / 900.0).abs() < 1e-4);
    }

    #[test]
    fn degenerate_aspect_falls_back() {
        let camera = PerspectiveCamera::new(0, 0);
        assert_eq!(camera.view_size(), FALLBACK_VIEW_SIZE);
        let camera = PerspectiveCamera::new(800, 0);
        assert_eq!(camera.view_size(), FALLBACK_VIEW_SIZE);
    }

    #[test]
    fn plane_corners_project_to_clip_corners() {
        let camera = PerspectiveCamera::new(1280, 720);
        let plane = PlaneGeometry::new(camera.view_size());
        let matrix = camera.view_projection();
        let top_right = transform(&matrix, plane.vertices()[1].position);
        assert!((top_right[0] - 1.0).abs() < 1e-4);
        assert!((top_right[1] - 1.0).abs() < 1e-4);
        assert!(top_right[2] > 0.0 && top_right[2] < 1.0);
        let bottom_left = transform(&matrix, plane.vertices()[2].position);
        assert!((bottom_left[0] + 1.0).abs() < 1e-4);
        assert!((bottom_left[1] + 1.0).abs() < 1e-4);
    }

    #[test]
    fn resize_rebuilds_plane_and_bumps_generation() {
        let mut backdrop = Backdrop::new(800, 600);
        let before = backdrop.plane().size();
        backdrop.resize(1200, 600);
        let after = backdrop.plane().size();
        assert_eq!(backdrop.generation(), 1);
        assert_eq!(backdrop.resolution(), (1200, 600));
        assert!((after.width / after.height - 2.0).abs() < 1e-4);
        assert!((before.height - after.height).abs() < 1e-4);
    }
}
