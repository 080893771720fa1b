//! Static montage table
//!
//! A montage names the channel layout and acquisition parameters sent to the
//! amplifier with the sampling-start command. The bridge's output stream is
//! always `channel_count + 2` wide: one slot per channel, then the event
//! slot and the running sample index.

use serde::Serialize;

use crate::{BridgeError, Result};

/// One selectable channel configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Montage {
    #[serde(skip)]
    pub id: u32,
    #[serde(skip)]
    pub name: &'static str,
    #[serde(rename = "channel_label")]
    pub channel_labels: &'static [&'static str],
    pub data_format: f64,
    pub gain: f64,
    pub impedance_interval: f64,
    pub layout: f64,
    pub marker_id: &'static str,
    pub output_rate: f64,
    pub radio_bandw: f64,
    pub radio_chan: f64,
    pub reference: &'static [&'static str],
    pub sampling_rate: f64,
}

const TEN_TWENTY: &[&str] = &[
    "Fp1", "Fpz", "Fp2", "F7", "F3", "Fz", "F4", "F8", "T3", "C3", "Cz", "C4", "T4", "T5", "P3",
    "Pz", "P4", "T6", "O1", "Oz", "O2", "A1", "A2",
];

/// All montages known to the bridge, indexed by ID.
pub static MONTAGES: &[Montage] = &[
    Montage {
        id: 0,
        name: "10-20 full",
        channel_labels: TEN_TWENTY,
        data_format: 0.0,
        gain: 12.0,
        impedance_interval: 0.0,
        layout: 1.0,
        marker_id: "",
        output_rate: 20.0,
        radio_bandw: 13.0,
        radio_chan: 1.0,
        reference: &["Fpz"],
        sampling_rate: 500.0,
    },
    Montage {
        id: 1,
        name: "Fp2 + heart rate",
        channel_labels: &["Fp2", "HR"],
        data_format: 0.0,
        gain: 12.0,
        impedance_interval: 0.0,
        layout: 1.0,
        marker_id: "",
        output_rate: 20.0,
        radio_bandw: 13.0,
        radio_chan: 1.0,
        reference: &["Fpz"],
        sampling_rate: 500.0,
    },
];

impl Montage {
    /// Look up a montage by ID.
    pub fn by_id(id: u32) -> Result<&'static Montage> {
        MONTAGES.iter().find(|m| m.id == id).ok_or_else(|| {
            let known: Vec<String> = MONTAGES.iter().map(|m| m.id.to_string()).collect();
            BridgeError::config_error(format!(
                "unknown montage {} (known: {})",
                id,
                known.join(", ")
            ))
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channel_labels.len()
    }

    /// Width of the output stream: channels, event slot, index slot.
    pub fn stream_width(&self) -> usize {
        self.channel_count() + 2
    }

    /// JSON body of the `action/sampling/start` command.
    pub fn start_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
