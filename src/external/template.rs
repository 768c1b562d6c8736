use std::fs;
use std::path::{Component, Path, PathBuf};

use regex::Regex;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{PipelineError, Result};
use crate::util::{ensure_directory, remove_path};

use super::{PackageContext, Packager};

/// Renders a cookiecutter-style template tree and drops the compiled
/// dictionary into `<package_name>/data/`.
///
/// The template directory must contain exactly one top-level directory whose
/// (rendered) name becomes the package root under `dist_dir`. Placeholders look
/// like `{{ name }}` or `{{ cookiecutter.name }}`.
#[derive(Debug, Clone)]
pub struct TemplatePackager {
    template_dir: PathBuf,
    dist_dir: PathBuf,
}

impl TemplatePackager {
    pub fn new(template_dir: impl Into<PathBuf>, dist_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            dist_dir: dist_dir.into(),
        }
    }

    fn template_root(&self) -> Result<PathBuf> {
        let entries = fs::read_dir(&self.template_dir).map_err(|err| failure(format!(
            "failed to read template directory {}: {err}",
            self.template_dir.display()
        )))?;

        let mut roots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| PipelineError::io(&self.template_dir, err))?;
            if entry.path().is_dir() {
                roots.push(entry.path());
            }
        }

        match roots.len() {
            1 => Ok(roots.remove(0)),
            count => Err(failure(format!(
                "template directory {} must contain exactly one top-level directory, found {count}",
                self.template_dir.display()
            ))),
        }
    }

    fn render_tree(&self, renderer: &Renderer<'_>, root: &Path, target: &Path) -> Result<()> {
        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|err| failure(format!("failed to walk template: {err}")))?;
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|err| failure(format!("template path outside root: {err}")))?;
            let destination = target.join(renderer.render_path(relative)?);

            if entry.file_type().is_dir() {
                ensure_directory(&destination)?;
                continue;
            }

            let raw = fs::read(entry.path()).map_err(|err| PipelineError::io(entry.path(), err))?;
            let rendered = match String::from_utf8(raw) {
                Ok(text) => renderer.render(&text)?.into_bytes(),
                Err(binary) => binary.into_bytes(),
            };
            if let Some(parent) = destination.parent() {
                ensure_directory(parent)?;
            }
            fs::write(&destination, rendered)
                .map_err(|err| PipelineError::io(&destination, err))?;
        }

        Ok(())
    }

    fn populate(
        &self,
        renderer: &Renderer<'_>,
        root: &Path,
        target: &Path,
        source_dir: &Path,
        version_file: Option<&Path>,
        context: &PackageContext,
    ) -> Result<()> {
        self.render_tree(renderer, root, target)?;

        let package_dir = target.join(&context.package_name);
        copy_tree(source_dir, &package_dir.join("data"))?;

        if let Some(version_file) = version_file {
            let destination = package_dir.join("version.py");
            fs::copy(version_file, &destination)
                .map_err(|err| PipelineError::io(version_file, err))?;
        }

        Ok(())
    }
}

impl Packager for TemplatePackager {
    fn package(
        &self,
        source_dir: &Path,
        version_file: Option<&Path>,
        context: &PackageContext,
    ) -> Result<PathBuf> {
        if !source_dir.is_dir() {
            return Err(failure(format!(
                "compiled dictionary directory missing: {}",
                source_dir.display()
            )));
        }

        let renderer = Renderer::new(context)?;
        let root = self.template_root()?;
        let root_name = root
            .strip_prefix(&self.template_dir)
            .map_err(|err| failure(format!("template path outside root: {err}")))?;
        let target = self.dist_dir.join(renderer.render_path(root_name)?);

        remove_path(&target)?;
        ensure_directory(&target)?;

        if let Err(err) = self.populate(&renderer, &root, &target, source_dir, version_file, context)
        {
            if let Err(cleanup_err) = remove_path(&target) {
                warn!(path = %target.display(), error = %cleanup_err, "failed to remove partial package");
            }
            return Err(err);
        }

        info!(path = %target.display(), version = %context.version, "package rendered");
        Ok(target)
    }
}

fn failure(message: String) -> PipelineError {
    PipelineError::PackagingFailure { message }
}

struct Renderer<'a> {
    context: &'a PackageContext,
    placeholder: Regex,
}

impl<'a> Renderer<'a> {
    fn new(context: &'a PackageContext) -> Result<Self> {
        let placeholder = Regex::new(r"\{\{\s*(?:cookiecutter\.)?([A-Za-z_][A-Za-z0-9_]*)\s*\}\}")
            .map_err(|err| failure(format!("failed to compile placeholder pattern: {err}")))?;
        Ok(Self {
            context,
            placeholder,
        })
    }

    fn render(&self, text: &str) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for captures in self.placeholder.captures_iter(text) {
            let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let value = self.context.lookup(key.as_str()).ok_or_else(|| {
                failure(format!("unknown template variable {:?}", key.as_str()))
            })?;
            out.push_str(&text[last..whole.start()]);
            out.push_str(value);
            last = whole.end();
        }
        out.push_str(&text[last..]);

        Ok(out)
    }

    fn render_path(&self, relative: &Path) -> Result<PathBuf> {
        let mut rendered = PathBuf::new();
        for component in relative.components() {
            let Component::Normal(name) = component else {
                return Err(failure(format!(
                    "unexpected template path component in {}",
                    relative.display()
                )));
            };
            let name = name.to_str().ok_or_else(|| {
                failure(format!("non UTF-8 template path: {}", relative.display()))
            })?;
            let name = self.render(name)?;
            if name.is_empty() || name.contains('/') || name == ".." {
                return Err(failure(format!(
                    "template path {} renders to an invalid name {name:?}",
                    relative.display()
                )));
            }
            rendered.push(name);
        }
        Ok(rendered)
    }
}

fn copy_tree(source: &Path, destination: &Path) -> Result<()> {
    ensure_directory(destination)?;

    for entry in WalkDir::new(source).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|err| failure(format!("failed to walk {}: {err}", source.display())))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|err| failure(format!("path outside source: {err}")))?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            ensure_directory(&target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|err| PipelineError::io(entry.path(), err))?;
        }
    }

    Ok(())
}
