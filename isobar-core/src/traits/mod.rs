//! Collaborator traits
//!
//! These traits define the interface between the control loop and the
//! hardware-specific implementations (sensor drivers, display, radio,
//! buttons and the status LED).

pub mod display;
pub mod input;
pub mod network;
pub mod sensor;

pub use display::{DisplayError, DisplayRenderer, RenderContext};
pub use input::{Button, InputSource, StatusIndicator};
pub use network::{NetworkError, NetworkManager, PublishError, TelemetryPublisher};
pub use sensor::{EnvironmentSensor, LightSensor, SensorError};
