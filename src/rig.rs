use crate::codec::IrCodec;
use crate::hal::{Clock, SenseLine, StatusLed};
use crate::report::Console;

/// Everything one node drives: the IR codec, the sense line, the status
/// indicator, the clock and the report console.
pub struct Rig {
    pub codec: Box<dyn IrCodec>,
    pub sense: Box<dyn SenseLine>,
    pub led: Box<dyn StatusLed>,
    pub clock: Box<dyn Clock>,
    pub console: Console,
}
