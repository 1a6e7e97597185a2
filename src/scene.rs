use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::{
    core::{FrameIndex, Rgb},
    error::{SitelapseError, SitelapseResult},
};

/// Narrow interface over the rendering host's scene state.
///
/// The host is a single-session, stateful resource: the active camera and the
/// frame cursor are scene-global, so calls must stay strictly sequential.
/// The driver mutates the scene in place and never restores it; run it
/// against a disposable copy of the source asset, not the authoritative
/// original.
pub trait SceneHost {
    /// Names of the addressable objects in the scene.
    fn object_names(&self) -> Vec<String>;

    /// Names of the cameras available for rendering.
    fn camera_names(&self) -> Vec<String>;

    /// Number of objects currently sharing `object`'s material.
    fn material_users(&self, object: &str) -> SitelapseResult<usize>;

    /// Give `object` an exclusively owned copy of its material.
    ///
    /// An animated material must be owned by exactly one object; the driver
    /// calls this before the first color key whenever the material is shared,
    /// so color changes never leak across objects.
    fn make_material_unique(&mut self, object: &str) -> SitelapseResult<()>;

    /// Keyframe `object`'s visibility at `frame`. Hosts apply the flag to
    /// both render and viewport visibility.
    fn insert_visibility_key(
        &mut self,
        object: &str,
        frame: FrameIndex,
        visible: bool,
    ) -> SitelapseResult<()>;

    /// Keyframe the color-driving parameter of `object`'s material at
    /// `frame`. A later key at the same frame replaces an earlier one.
    fn insert_color_key(
        &mut self,
        object: &str,
        frame: FrameIndex,
        color: Rgb,
    ) -> SitelapseResult<()>;

    fn set_active_camera(&mut self, camera: &str) -> SitelapseResult<()>;

    fn set_frame(&mut self, frame: FrameIndex) -> SitelapseResult<()>;

    /// Render the current frame through the active camera to `path`.
    fn render_current_frame(&mut self, path: &Path) -> SitelapseResult<()>;
}

/// Every scene mutation a [`RecordingScene`] observes, in call order.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneCall {
    MaterialCloned {
        object: String,
    },
    VisibilityKey {
        object: String,
        frame: FrameIndex,
        visible: bool,
    },
    ColorKey {
        object: String,
        frame: FrameIndex,
        color: Rgb,
    },
    CameraActivated {
        camera: String,
    },
    FrameSet {
        frame: FrameIndex,
    },
    FrameRendered {
        path: PathBuf,
    },
}

/// In-memory scene for tests and debugging: records every call and writes
/// empty placeholder files for rendered frames so downstream path handling
/// stays real.
#[derive(Debug, Default)]
pub struct RecordingScene {
    materials: BTreeMap<String, u32>,
    cameras: Vec<String>,
    next_material: u32,
    active_camera: Option<String>,
    current_frame: FrameIndex,
    calls: Vec<SceneCall>,
}

impl RecordingScene {
    pub fn new<'a, O, C>(objects: O, cameras: C) -> Self
    where
        O: IntoIterator<Item = &'a str>,
        C: IntoIterator<Item = &'a str>,
    {
        let mut scene = Self::default();
        for object in objects {
            let id = scene.next_material;
            scene.next_material += 1;
            scene.materials.insert(object.to_string(), id);
        }
        scene.cameras = cameras.into_iter().map(str::to_string).collect();
        scene
    }

    /// Put every named object on one shared material.
    pub fn share_material(&mut self, objects: &[&str]) {
        let id = self.next_material;
        self.next_material += 1;
        for object in objects {
            self.materials.insert(object.to_string(), id);
        }
    }

    pub fn calls(&self) -> &[SceneCall] {
        &self.calls
    }

    pub fn active_camera(&self) -> Option<&str> {
        self.active_camera.as_deref()
    }

    pub fn current_frame(&self) -> FrameIndex {
        self.current_frame
    }

    fn material_of(&self, object: &str) -> SitelapseResult<u32> {
        self.materials.get(object).copied().ok_or_else(|| {
            SitelapseError::binding(format!("object '{object}' not found in scene"))
        })
    }
}

impl SceneHost for RecordingScene {
    fn object_names(&self) -> Vec<String> {
        self.materials.keys().cloned().collect()
    }

    fn camera_names(&self) -> Vec<String> {
        self.cameras.clone()
    }

    fn material_users(&self, object: &str) -> SitelapseResult<usize> {
        let id = self.material_of(object)?;
        Ok(self.materials.values().filter(|m| **m == id).count())
    }

    fn make_material_unique(&mut self, object: &str) -> SitelapseResult<()> {
        self.material_of(object)?;
        let fresh = self.next_material;
        self.next_material += 1;
        self.materials.insert(object.to_string(), fresh);
        self.calls.push(SceneCall::MaterialCloned {
            object: object.to_string(),
        });
        Ok(())
    }

    fn insert_visibility_key(
        &mut self,
        object: &str,
        frame: FrameIndex,
        visible: bool,
    ) -> SitelapseResult<()> {
        self.material_of(object)?;
        self.calls.push(SceneCall::VisibilityKey {
            object: object.to_string(),
            frame,
            visible,
        });
        Ok(())
    }

    fn insert_color_key(
        &mut self,
        object: &str,
        frame: FrameIndex,
        color: Rgb,
    ) -> SitelapseResult<()> {
        self.material_of(object)?;
        self.calls.push(SceneCall::ColorKey {
            object: object.to_string(),
            frame,
            color,
        });
        Ok(())
    }

    fn set_active_camera(&mut self, camera: &str) -> SitelapseResult<()> {
        if !self.cameras.iter().any(|c| c == camera) {
            return Err(SitelapseError::binding(format!(
                "camera '{camera}' not found in scene"
            )));
        }
        self.active_camera = Some(camera.to_string());
        self.calls.push(SceneCall::CameraActivated {
            camera: camera.to_string(),
        });
        Ok(())
    }

    fn set_frame(&mut self, frame: FrameIndex) -> SitelapseResult<()> {
        self.current_frame = frame;
        self.calls.push(SceneCall::FrameSet { frame });
        Ok(())
    }

    fn render_current_frame(&mut self, path: &Path) -> SitelapseResult<()> {
        if self.active_camera.is_none() {
            return Err(SitelapseError::validation(
                "render requested with no active camera",
            ));
        }
        std::fs::write(path, b"").map_err(|e| {
            SitelapseError::validation(format!(
                "failed to write placeholder frame '{}': {e}",
                path.display()
            ))
        })?;
        self.calls.push(SceneCall::FrameRendered {
            path: path.to_path_buf(),
        });
        Ok(())
    }
}
