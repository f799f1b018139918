//! # Messages exchanged between tasks.
//!
//! [`Message`] is a closed set partitioned into three families:
//! - **Control** directives (`Start`/`Stop`) on `glucose_ctrl` / `insulin_ctrl`.
//!   Only the most recent one matters; a backlog collapses to the newest.
//! - **Lifecycle** (`Halt`), the only shutdown signal.
//! - **Alerts** ([`Alert`]) on the display channel, ordered and lossless.
//!
//! The "no message" marker is plain `Option::None`.
//!
//! Rendering is a total `match`: adding an [`Alert`] variant does not compile
//! until [`Alert::text`] handles it.

use std::fmt;

/// One of the two interchangeable solution reservoirs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reservoir {
    One,
    Two,
}

impl Reservoir {
    /// Bank index of this reservoir.
    pub fn index(self) -> usize {
        match self {
            Reservoir::One => 0,
            Reservoir::Two => 1,
        }
    }

    /// Operator-facing 1-based number.
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// The other reservoir.
    pub fn other(self) -> Self {
        match self {
            Reservoir::One => Reservoir::Two,
            Reservoir::Two => Reservoir::One,
        }
    }
}

/// Operator-facing alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alert {
    GlycemiaCritical,
    GlycemiaNormal,
    GlucoseStart,
    GlucoseStop,
    InsulinStart,
    InsulinStop,
    AntibioticDue,
    AnticoagulantDue,
    /// Active reservoir reached the weak level (5%).
    SyringeLow(Reservoir),
    /// Active reservoir reached the critical level (1%).
    SyringeCritical(Reservoir),
    /// The bank switched to the other reservoir.
    Switch,
    /// The inactive reservoir was refilled.
    Reset,
}

impl Alert {
    /// Fixed human-readable text for this alert.
    pub fn text(self) -> &'static str {
        match self {
            Alert::GlycemiaCritical => "Glycemia critical",
            Alert::GlycemiaNormal => "Glycemia normal",
            Alert::GlucoseStart => "Start glucose injection",
            Alert::GlucoseStop => "Stop glucose injection",
            Alert::InsulinStart => "Start insulin injection",
            Alert::InsulinStop => "Stop insulin injection",
            Alert::AntibioticDue => "Antibiotic injection",
            Alert::AnticoagulantDue => "Anticoagulant injection",
            Alert::SyringeLow(Reservoir::One) => "Solution level in syringe 1 reaches 5%",
            Alert::SyringeLow(Reservoir::Two) => "Solution level in syringe 2 reaches 5%",
            Alert::SyringeCritical(Reservoir::One) => "Solution level in syringe 1 reaches 1%",
            Alert::SyringeCritical(Reservoir::Two) => "Solution level in syringe 2 reaches 1%",
            Alert::Switch => "Switch between syringe",
            Alert::Reset => "Reset inactive syringe",
        }
    }
}

/// Family a [`Message`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFamily {
    Control,
    Lifecycle,
    Alert,
}

/// Message carried by a bus channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Message {
    /// Begin (or keep) injecting.
    Start,
    /// Stop injecting.
    Stop,
    /// Terminate the consumer.
    Halt,
    /// Operator-facing alert.
    Alert(Alert),
}

impl Message {
    pub fn family(self) -> MessageFamily {
        match self {
            Message::Start | Message::Stop => MessageFamily::Control,
            Message::Halt => MessageFamily::Lifecycle,
            Message::Alert(_) => MessageFamily::Alert,
        }
    }

    #[inline]
    pub fn is_halt(self) -> bool {
        matches!(self, Message::Halt)
    }

    /// Display line for this message, `None` for control directives.
    pub fn render(self) -> Option<&'static str> {
        match self {
            Message::Halt => Some("Stopping the system"),
            Message::Alert(alert) => Some(alert.text()),
            Message::Start | Message::Stop => None,
        }
    }
}

impl From<Alert> for Message {
    fn from(alert: Alert) -> Self {
        Message::Alert(alert)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Start => f.write_str("START"),
            Message::Stop => f.write_str("STOP"),
            Message::Halt => f.write_str("HALT"),
            Message::Alert(a) => write!(f, "{a:?}"),
        }
    }
}
