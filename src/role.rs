use crate::codec::IrCodec;
use crate::error::LinkError;
use crate::hal::{Level, SenseLine, StatusLed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sender,
    Receiver,
    /// A test failed; the run loop holds the indicator and then resumes as
    /// receiver.
    Error,
}

/// Elects this node's role from a single sample of the sense line.
///
/// An idle (high) line means no emitter is driving our receiver, so we are the
/// receiver: the capture path is armed and the indicator starts off. Anything
/// else makes us the sender, which never touches the indicator.
pub fn detect_role(
    sense: &mut dyn SenseLine,
    codec: &mut dyn IrCodec,
    led: &mut dyn StatusLed,
) -> Result<Role, LinkError> {
    match sense.level()? {
        Level::High => {
            codec.begin_capture()?;
            led.set(false)?;
            Ok(Role::Receiver)
        }
        Level::Low => Ok(Role::Sender),
    }
}
