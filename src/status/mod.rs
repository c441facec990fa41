//! # Status & Error Taxonomy
//!
//! Typed representations of everything the printer reports back:
//!
//! - [`DeviceError`]: the closed set of device fault codes, each with a
//!   fatal/non-fatal attribute controlling whether the active job fails
//! - [`StatusEvent`]: telemetry changes (cover, battery, paper, ribbon,
//!   Wi-Fi signal) decoded from numeric key/value pairs
//! - [`Progress`]: per-copy completion reports for the active job
//!
//! The numeric codes are wire-level values; callers only ever see the typed
//! variants.

use std::fmt;

// ============================================================================
// DEVICE ERRORS
// ============================================================================

/// Device-reported error codes.
///
/// This is a closed enum: codes the firmware may add later decode to a
/// generic unknown-status event instead of failing the decoder.
///
/// `is_fatal()` reports whether the error aborts the active print job.
/// Non-fatal errors (density/material set failures) are reported but allow
/// printing to continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    CoverOpen,
    OutOfPaper,
    LowBattery,
    BatteryFault,
    ManualStop,
    DataError,
    OverTemperature,
    PaperOutputFault,
    Busy,
    HeadNotDetected,
    AmbientTooCold,
    HeadUnlocked,
    RibbonMissing,
    RibbonMismatch,
    RibbonUsed,
    UnsupportedPaper,
    PaperSetFailed,
    ModeSetFailed,
    DensitySetFailed,
    RfidWriteFailed,
    MarginError,
    CommTimeout,
    Disconnected,
    CanvasParamError,
    RotationParamError,
    JsonParamError,
    CoverOpenDetectionDisabled,
    PaperTypeCheck,
    NonRfidModeRfidLabel,
    DensityUnsupported,
    ModeUnsupported,
    MaterialSetFailed,
    MaterialUnsupported,
    PrinterFault,
    CutterFault,
    OutOfPaperSecondary,
    UnrecoverableFault,
    IllegalLabel,
    IllegalRibbonAndLabel,
}

impl DeviceError {
    /// Wire code of this error.
    pub fn code(self) -> u8 {
        match self {
            DeviceError::CoverOpen => 1,
            DeviceError::OutOfPaper => 2,
            DeviceError::LowBattery => 3,
            DeviceError::BatteryFault => 4,
            DeviceError::ManualStop => 5,
            DeviceError::DataError => 6,
            DeviceError::OverTemperature => 7,
            DeviceError::PaperOutputFault => 8,
            DeviceError::Busy => 9,
            DeviceError::HeadNotDetected => 10,
            DeviceError::AmbientTooCold => 11,
            DeviceError::HeadUnlocked => 12,
            DeviceError::RibbonMissing => 13,
            DeviceError::RibbonMismatch => 14,
            DeviceError::RibbonUsed => 15,
            DeviceError::UnsupportedPaper => 16,
            DeviceError::PaperSetFailed => 17,
            DeviceError::ModeSetFailed => 18,
            DeviceError::DensitySetFailed => 19,
            DeviceError::RfidWriteFailed => 20,
            DeviceError::MarginError => 21,
            DeviceError::CommTimeout => 22,
            DeviceError::Disconnected => 23,
            DeviceError::CanvasParamError => 24,
            DeviceError::RotationParamError => 25,
            DeviceError::JsonParamError => 26,
            DeviceError::CoverOpenDetectionDisabled => 27,
            DeviceError::PaperTypeCheck => 28,
            DeviceError::NonRfidModeRfidLabel => 29,
            DeviceError::DensityUnsupported => 30,
            DeviceError::ModeUnsupported => 31,
            DeviceError::MaterialSetFailed => 32,
            DeviceError::MaterialUnsupported => 33,
            DeviceError::PrinterFault => 34,
            DeviceError::CutterFault => 35,
            DeviceError::OutOfPaperSecondary => 36,
            DeviceError::UnrecoverableFault => 37,
            DeviceError::IllegalLabel => 50,
            DeviceError::IllegalRibbonAndLabel => 51,
        }
    }

    /// Decode a wire code. Unknown codes return `None` (the decoder turns
    /// those into [`crate::protocol::DeviceEvent::UnknownDeviceStatus`]).
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => DeviceError::CoverOpen,
            2 => DeviceError::OutOfPaper,
            3 => DeviceError::LowBattery,
            4 => DeviceError::BatteryFault,
            5 => DeviceError::ManualStop,
            6 => DeviceError::DataError,
            7 => DeviceError::OverTemperature,
            8 => DeviceError::PaperOutputFault,
            9 => DeviceError::Busy,
            10 => DeviceError::HeadNotDetected,
            11 => DeviceError::AmbientTooCold,
            12 => DeviceError::HeadUnlocked,
            13 => DeviceError::RibbonMissing,
            14 => DeviceError::RibbonMismatch,
            15 => DeviceError::RibbonUsed,
            16 => DeviceError::UnsupportedPaper,
            17 => DeviceError::PaperSetFailed,
            18 => DeviceError::ModeSetFailed,
            19 => DeviceError::DensitySetFailed,
            20 => DeviceError::RfidWriteFailed,
            21 => DeviceError::MarginError,
            22 => DeviceError::CommTimeout,
            23 => DeviceError::Disconnected,
            24 => DeviceError::CanvasParamError,
            25 => DeviceError::RotationParamError,
            26 => DeviceError::JsonParamError,
            27 => DeviceError::CoverOpenDetectionDisabled,
            28 => DeviceError::PaperTypeCheck,
            29 => DeviceError::NonRfidModeRfidLabel,
            30 => DeviceError::DensityUnsupported,
            31 => DeviceError::ModeUnsupported,
            32 => DeviceError::MaterialSetFailed,
            33 => DeviceError::MaterialUnsupported,
            34 => DeviceError::PrinterFault,
            35 => DeviceError::CutterFault,
            36 => DeviceError::OutOfPaperSecondary,
            37 => DeviceError::UnrecoverableFault,
            50 => DeviceError::IllegalLabel,
            51 => DeviceError::IllegalRibbonAndLabel,
            _ => return None,
        })
    }

    /// Whether this error aborts the active print job.
    ///
    /// Density and label-material set failures are report-only: the printer
    /// keeps printing with its previous setting.
    pub fn is_fatal(self) -> bool {
        !matches!(
            self,
            DeviceError::DensitySetFailed | DeviceError::MaterialSetFailed
        )
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DeviceError::CoverOpen => "cover open",
            DeviceError::OutOfPaper => "out of paper",
            DeviceError::LowBattery => "low battery",
            DeviceError::BatteryFault => "battery fault",
            DeviceError::ManualStop => "manually stopped",
            DeviceError::DataError => "print data error",
            DeviceError::OverTemperature => "print head too hot",
            DeviceError::PaperOutputFault => "paper output fault",
            DeviceError::Busy => "printer busy",
            DeviceError::HeadNotDetected => "print head not detected",
            DeviceError::AmbientTooCold => "ambient temperature too low",
            DeviceError::HeadUnlocked => "print head not locked",
            DeviceError::RibbonMissing => "ribbon not detected",
            DeviceError::RibbonMismatch => "mismatched ribbon",
            DeviceError::RibbonUsed => "ribbon already used",
            DeviceError::UnsupportedPaper => "unsupported paper type",
            DeviceError::PaperSetFailed => "failed to set paper",
            DeviceError::ModeSetFailed => "failed to set print mode",
            DeviceError::DensitySetFailed => "failed to set density",
            DeviceError::RfidWriteFailed => "RFID write failed",
            DeviceError::MarginError => "margin setting error",
            DeviceError::CommTimeout => "communication timeout",
            DeviceError::Disconnected => "printer disconnected",
            DeviceError::CanvasParamError => "canvas parameter error",
            DeviceError::RotationParamError => "rotation parameter error",
            DeviceError::JsonParamError => "label JSON parameter error",
            DeviceError::CoverOpenDetectionDisabled => {
                "paper output fault (cover detection disabled)"
            }
            DeviceError::PaperTypeCheck => "check paper type",
            DeviceError::NonRfidModeRfidLabel => "RFID label in non-RFID mode",
            DeviceError::DensityUnsupported => "density not supported",
            DeviceError::ModeUnsupported => "print mode not supported",
            DeviceError::MaterialSetFailed => "label material set failed",
            DeviceError::MaterialUnsupported => "label material not supported",
            DeviceError::PrinterFault => "printer fault",
            DeviceError::CutterFault => "cutter fault",
            DeviceError::OutOfPaperSecondary => "no paper loaded",
            DeviceError::UnrecoverableFault => "unrecoverable printer fault",
            DeviceError::IllegalLabel => "illegal label",
            DeviceError::IllegalRibbonAndLabel => "illegal ribbon and label",
        };
        write!(f, "{} (code {})", text, self.code())
    }
}

// ============================================================================
// TELEMETRY
// ============================================================================

/// Telemetry field keys reported by the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusField {
    /// Cover state: 0 open, 1 closed
    CoverState,
    /// Battery level: 1..=4
    BatteryLevel,
    /// Paper loaded: 0 no, 1 yes
    PaperLoaded,
    /// Ribbon state: 0 missing, 1 present
    RibbonState,
    /// Wi-Fi signal strength
    WifiSignal,
}

impl StatusField {
    pub fn from_key(key: u8) -> Option<Self> {
        match key {
            1 => Some(StatusField::CoverState),
            2 => Some(StatusField::BatteryLevel),
            3 => Some(StatusField::PaperLoaded),
            5 => Some(StatusField::RibbonState),
            6 => Some(StatusField::WifiSignal),
            _ => None,
        }
    }

    pub fn key(self) -> u8 {
        match self {
            StatusField::CoverState => 1,
            StatusField::BatteryLevel => 2,
            StatusField::PaperLoaded => 3,
            StatusField::RibbonState => 5,
            StatusField::WifiSignal => 6,
        }
    }
}

/// A single decoded telemetry change.
///
/// Published once on the session event channel; not retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    Cover { closed: bool },
    Battery { level: u8 },
    PaperLoaded { loaded: bool },
    Ribbon { present: bool },
    WifiSignal { strength: u8 },
}

impl StatusEvent {
    /// Build a typed event from a raw key/value pair.
    ///
    /// Returns `None` for unknown keys; the decoder reports those as
    /// unknown-status events rather than dropping them.
    pub fn from_raw(key: u8, value: u8) -> Option<Self> {
        let field = StatusField::from_key(key)?;
        Some(match field {
            StatusField::CoverState => StatusEvent::Cover { closed: value != 0 },
            StatusField::BatteryLevel => StatusEvent::Battery { level: value },
            StatusField::PaperLoaded => StatusEvent::PaperLoaded { loaded: value != 0 },
            StatusField::RibbonState => StatusEvent::Ribbon { present: value != 0 },
            StatusField::WifiSignal => StatusEvent::WifiSignal { strength: value },
        })
    }
}

// ============================================================================
// PROGRESS REPORTS
// ============================================================================

/// Per-copy completion report for the active job.
///
/// `total_count` is cumulative over the whole job. The remaining fields are
/// optional: older firmware omits them. Individual reports may be lost in
/// transit, so consumers must treat `total_count` as a high-water mark.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Progress {
    /// Total copies completed so far (cumulative, all pages)
    pub total_count: u32,
    /// Page currently printing (1-based)
    pub page_no: Option<u32>,
    /// Copy number within the current page
    pub page_count: Option<u32>,
    /// TID returned after an RFID write
    pub tid: Option<String>,
    /// Ribbon used so far, in millimeters
    pub carbon_used: Option<u32>,
}

/// Paper geometry installed in the printer, as read back by a paper-info
/// query.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PaperInfo {
    /// Paper type code (1 gap, 2 black mark, 3 continuous, 4 perforated,
    /// 5 transparent, 6 label)
    pub paper_type: u8,
    /// Paper width including gap, in pixels
    pub width_px: u16,
    /// Paper height including gap, in pixels
    pub height_px: u16,
    /// Gap (or black mark) height in pixels
    pub gap_px: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_round_trip() {
        for code in (1..=37).chain([50, 51]) {
            let err = DeviceError::from_code(code).expect("known code");
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(DeviceError::from_code(0), None);
        assert_eq!(DeviceError::from_code(38), None);
        assert_eq!(DeviceError::from_code(49), None);
        assert_eq!(DeviceError::from_code(255), None);
    }

    #[test]
    fn test_fatal_flags() {
        // The two report-only errors
        assert!(!DeviceError::DensitySetFailed.is_fatal());
        assert!(!DeviceError::MaterialSetFailed.is_fatal());
        // Everything else aborts the job
        assert!(DeviceError::CoverOpen.is_fatal());
        assert!(DeviceError::Disconnected.is_fatal());
        assert!(DeviceError::MaterialUnsupported.is_fatal());
        assert!(DeviceError::CutterFault.is_fatal());
        assert!(DeviceError::IllegalLabel.is_fatal());
    }

    #[test]
    fn test_status_event_from_raw() {
        assert_eq!(
            StatusEvent::from_raw(1, 0),
            Some(StatusEvent::Cover { closed: false })
        );
        assert_eq!(
            StatusEvent::from_raw(2, 4),
            Some(StatusEvent::Battery { level: 4 })
        );
        assert_eq!(
            StatusEvent::from_raw(5, 1),
            Some(StatusEvent::Ribbon { present: true })
        );
        // Key 4 is unassigned
        assert_eq!(StatusEvent::from_raw(4, 1), None);
    }
}
