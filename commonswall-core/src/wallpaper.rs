use anyhow::{Context, Result};
use log::info;
use std::path::Path;

use crate::error::CoreError;
use crate::services::{CommandRunner, DefaultServiceProvider, SessionDetector};

const IMAGE_PATH: &str = "{image_path}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopSession {
    Gnome,
    Mate,
}

impl DesktopSession {
    /// Checked in this order.
    pub const ALL: [DesktopSession; 2] = [DesktopSession::Gnome, DesktopSession::Mate];

    pub fn process_name(self) -> &'static str {
        match self {
            DesktopSession::Gnome => "gnome-session",
            DesktopSession::Mate => "mate-session",
        }
    }

    fn command_template(self) -> (&'static str, &'static [&'static str]) {
        match self {
            DesktopSession::Gnome => (
                "gsettings",
                &["set", "org.gnome.desktop.background", "picture-uri", "file://{image_path}"],
            ),
            DesktopSession::Mate => (
                "gsettings",
                &["set", "org.mate.background", "picture-filename", "{image_path}"],
            ),
        }
    }

    /// Program and arguments that apply `image_path` in this session.
    pub fn command(self, image_path: &Path) -> (String, Vec<String>) {
        let (program, template) = self.command_template();
        let path = image_path.to_string_lossy();
        let args = template
            .iter()
            .map(|arg| arg.replace(IMAGE_PATH, &path))
            .collect();
        (program.to_string(), args)
    }
}

/// Sets the wallpaper for whichever supported desktop session is running.
pub struct BackgroundSetter<S = DefaultServiceProvider> {
    services: S,
}

impl BackgroundSetter<DefaultServiceProvider> {
    pub fn new() -> Self {
        BackgroundSetter {
            services: DefaultServiceProvider,
        }
    }
}

impl Default for BackgroundSetter<DefaultServiceProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SessionDetector + CommandRunner> BackgroundSetter<S> {
    pub fn with_services(services: S) -> Self {
        BackgroundSetter { services }
    }

    pub fn services(&self) -> &S {
        &self.services
    }

    pub fn detect_session(&self) -> Option<DesktopSession> {
        DesktopSession::ALL
            .into_iter()
            .find(|session| self.services.is_running(session.process_name()))
    }

    pub fn set_wallpaper(&self, image_path: &Path) -> Result<()> {
        let absolute = std::path::absolute(image_path)
            .with_context(|| format!("Failed to resolve {}", image_path.display()))?;

        let session = self.detect_session().ok_or_else(|| {
            let names: Vec<_> = DesktopSession::ALL.iter().map(|s| s.process_name()).collect();
            CoreError::NoDesktopSession(names.join(", "))
        })?;

        let (program, args) = session.command(&absolute);
        info!("Running: {} {}", program, args.join(" "));
        if !self.services.run(&program, &args)? {
            return Err(CoreError::CommandFailed(program).into());
        }
        Ok(())
    }
}
