use std::collections::BTreeMap;

use log::{debug, error, warn};

use crate::clock::Millis;
use crate::error::RegistryError;
use crate::gfx::{Graphics, RenderTarget};
use crate::part::{FrameContext, Part, PartSettings, PartStatus};

/// A part together with the state the scheduler keeps for it.
pub struct RegisteredPart {
    part: Box<dyn Part>,
    settings: PartSettings,
    status: PartStatus,
}

impl RegisteredPart {
    pub fn settings(&self) -> PartSettings {
        self.settings
    }

    pub fn status(&self) -> PartStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    /// Time since the part was started, if it is running.
    pub fn elapsed(&self, now: Millis) -> Option<Millis> {
        match self.status {
            PartStatus::Running { start_time } => Some(now - start_time),
            PartStatus::Registered => None,
        }
    }
}

impl std::fmt::Debug for RegisteredPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredPart")
            .field("settings", &self.settings)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Name-keyed collection of parts. Running parts are a subset of the
/// registered ones by construction: the running flag lives on the entry.
#[derive(Debug, Default)]
pub struct PartRegistry {
    parts: BTreeMap<String, RegisteredPart>,
}

impl PartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Registers `part` under `name` with default settings.
    ///
    /// Registering an existing name replaces the old entry, which is returned.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        part: impl Part + 'static,
    ) -> Result<Option<Box<dyn Part>>, RegistryError> {
        self.add_boxed(name, Box::new(part), PartSettings::default())
    }

    pub fn add_boxed(
        &mut self,
        name: impl Into<String>,
        part: Box<dyn Part>,
        settings: PartSettings,
    ) -> Result<Option<Box<dyn Part>>, RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let entry = RegisteredPart {
            part,
            settings,
            status: PartStatus::Registered,
        };
        let previous = self.parts.insert(name.clone(), entry);
        if previous.is_some() {
            warn!("part `{name}` registered twice; replacing the earlier registration");
        }
        Ok(previous.map(|entry| entry.part))
    }

    /// Unregisters a part and hands it back, whether or not it is running.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Part>> {
        let entry = self.parts.remove(name)?;
        if entry.is_running() {
            warn!("removing part `{name}` while it is running");
        }
        Some(entry.part)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredPart> {
        self.parts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.parts.get(name).is_some_and(RegisteredPart::is_running)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub fn running_names(&self) -> impl Iterator<Item = &str> {
        self.parts
            .iter()
            .filter(|(_, entry)| entry.is_running())
            .map(|(name, _)| name.as_str())
    }

    /// Marks a part running from `time`. Starting a running part restarts it.
    pub fn start(&mut self, name: &str, time: Millis) -> Result<(), RegistryError> {
        let entry = self.entry_mut(name)?;
        if entry.is_running() {
            debug!("restarting part `{name}` at {time} ms");
        }
        entry.status = PartStatus::Running { start_time: time };
        Ok(())
    }

    pub fn stop(&mut self, name: &str) -> Result<(), RegistryError> {
        let entry = self.entry_mut(name)?;
        if !entry.is_running() {
            return Err(RegistryError::NotRunning(name.to_string()));
        }
        entry.status = PartStatus::Registered;
        Ok(())
    }

    pub fn stop_all(&mut self) {
        for entry in self.parts.values_mut() {
            entry.status = PartStatus::Registered;
        }
    }

    /// Re-keys a part, keeping its settings and running status.
    ///
    /// If `new_name` is already taken, that entry is overwritten and returned.
    pub fn rename(
        &mut self,
        name: &str,
        new_name: &str,
    ) -> Result<Option<Box<dyn Part>>, RegistryError> {
        if new_name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if !self.parts.contains_key(name) {
            return Err(RegistryError::UnknownPart(name.to_string()));
        }
        if name == new_name {
            return Ok(None);
        }
        let entry = self.entry_remove(name)?;
        let displaced = self.parts.insert(new_name.to_string(), entry);
        if displaced.is_some() {
            warn!("renaming `{name}` to `{new_name}` replaced an existing part");
        }
        Ok(displaced.map(|entry| entry.part))
    }

    pub fn set_render_target(
        &mut self,
        name: &str,
        target: RenderTarget,
    ) -> Result<(), RegistryError> {
        self.entry_mut(name)?.settings.render_target = target;
        Ok(())
    }

    pub fn set_clear(&mut self, name: &str, clear: bool) -> Result<(), RegistryError> {
        self.entry_mut(name)?.settings.clear_before_draw = clear;
        Ok(())
    }

    /// Renders every running part at `time` and returns how many drew.
    ///
    /// Each part gets its target bound and optionally cleared before drawing,
    /// and the default target restored afterwards.
    pub fn render_running(&mut self, time: Millis, gfx: &mut dyn Graphics) -> usize {
        let mut rendered = 0;
        for (name, entry) in self.parts.iter_mut() {
            let PartStatus::Running { start_time } = entry.status else {
                continue;
            };
            let settings = entry.settings;
            if settings.render_target != RenderTarget::Framebuffer {
                gfx.bind_render_target(settings.render_target);
            }
            if settings.clear_before_draw {
                gfx.clear_framebuffer();
                gfx.clear_depth_stencil();
            }
            let frame = FrameContext {
                time,
                elapsed: time - start_time,
            };
            if let Err(err) = entry.part.render(gfx, &frame) {
                error!("part `{name}` failed to render: {err:?}");
            }
            gfx.bind_render_target(RenderTarget::Framebuffer);
            gfx.reset_state();
            rendered += 1;
        }
        rendered
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut RegisteredPart, RegistryError> {
        self.parts
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownPart(name.to_string()))
    }

    fn entry_remove(&mut self, name: &str) -> Result<RegisteredPart, RegistryError> {
        self.parts
            .remove(name)
            .ok_or_else(|| RegistryError::UnknownPart(name.to_string()))
    }
}
