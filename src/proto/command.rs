use crate::codec::Protocol;

/// Messages exchanged with the IR transceiver bridge, in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeMsg {
    // ---- Discovery ----
    Hello { id: String },
    Ack { id: String },

    // ---- Pins ----
    Sense,
    Level { level: LineLevel },
    Led { on: bool },

    // ---- Codec ----
    Encode {
        protocol: Protocol,
        value: u32,
        bits: u8,
    },
    EncodeRaw {
        khz: u32,
        timings: Vec<u16>,
    },
    CaptureArm,
    CapturePoll,
    CapturePending,
    CaptureDone {
        protocol: Option<Protocol>, // None = "unknown"
        value: u32,
        bits: u8,
        raw: Vec<u16>,
    },

    // ---- Generic replies ----
    Ok,
    Err { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLevel {
    High,
    Low,
}

impl BridgeMsg {
    /// Tag used when reporting a request in errors and traces.
    pub fn tag(&self) -> &'static str {
        use BridgeMsg as M;
        match self {
            M::Hello { .. } => "HELLO",
            M::Ack { .. } => "ACK",
            M::Sense => "SENSE",
            M::Level { .. } => "LEVEL",
            M::Led { .. } => "LED",
            M::Encode { .. } => "ENCODE",
            M::EncodeRaw { .. } => "ENCODE RAW",
            M::CaptureArm => "CAPTURE ARM",
            M::CapturePoll => "CAPTURE POLL",
            M::CapturePending => "CAPTURE PENDING",
            M::CaptureDone { .. } => "CAPTURE DONE",
            M::Ok => "OK",
            M::Err { .. } => "ERR",
        }
    }
}
