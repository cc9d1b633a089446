//! Scene references resolved against the project directory.

use std::path::PathBuf;

use gamebuilder_pipeline::{BuildError, SceneResolver};
use gamebuilder_presets::SceneRef;

/// Treats scene references as project-relative paths that must exist.
#[derive(Debug, Clone)]
pub struct ProjectSceneResolver {
    project_dir: PathBuf,
}

impl ProjectSceneResolver {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }
}

impl SceneResolver for ProjectSceneResolver {
    fn scene_path(&self, scene: &SceneRef) -> Result<PathBuf, BuildError> {
        if scene.as_str().trim().is_empty() {
            return Err(BuildError::Scene("empty scene reference".into()));
        }
        let path = self.project_dir.join(scene.as_str());
        if !path.is_file() {
            return Err(BuildError::Scene(format!(
                "scene {} not found in project",
                scene.as_str()
            )));
        }
        // The engine expects project-relative scene paths.
        Ok(PathBuf::from(scene.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_scene_resolves() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Assets/Scenes")).unwrap();
        std::fs::write(dir.path().join("Assets/Scenes/Main.unity"), b"%YAML").unwrap();

        let resolver = ProjectSceneResolver::new(dir.path());
        let path = resolver
            .scene_path(&SceneRef::new("Assets/Scenes/Main.unity"))
            .unwrap();
        assert_eq!(path, PathBuf::from("Assets/Scenes/Main.unity"));
    }

    #[test]
    fn missing_or_empty_scene_fails() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ProjectSceneResolver::new(dir.path());
        assert!(resolver.scene_path(&SceneRef::new("Assets/Nope.unity")).is_err());
        assert!(resolver.scene_path(&SceneRef::new("  ")).is_err());
    }
}
