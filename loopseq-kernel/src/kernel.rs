use std::sync::Arc;

use log::debug;

use crate::commands::command_queue;
use crate::shared::SharedState;
use crate::{Controller, KernelConfig, Renderer};

/// Creates the two halves of the kernel. The [`Renderer`] goes to the audio thread,
/// the [`Controller`] stays with whoever edits the sequences.
pub struct Kernel {
  controller: Controller,
  renderer: Renderer,
}

impl Kernel {
  pub fn new() -> Self {
    Self::with_config(KernelConfig::default())
  }

  pub fn with_config(config: KernelConfig) -> Self {
    debug!("Creating kernel with {:?}", config);
    let (tx, rx) = command_queue(config.command_queue_capacity);
    let shared = Arc::new(SharedState::new(config.initial_tempo(), config.repeating));
    let renderer = Renderer::new(rx, shared.clone(), &config);
    let controller = Controller::new(tx, shared, config);

    Self {
      controller,
      renderer,
    }
  }

  pub fn split(self) -> (Controller, Renderer) {
    let Self {
      controller,
      renderer,
    } = self;
    (controller, renderer)
  }
}

impl Default for Kernel {
  fn default() -> Self {
    Self::new()
  }
}
