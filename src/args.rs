use crate::settings::Settings;

use argh::FromArgs;
use std::path::PathBuf;

#[derive(FromArgs, Debug, Default)]
/// Connect to the nearest BLE Heart Rate Monitor and print its readings
pub struct TopLevelCmd {
    /// specify config file path
    #[argh(option, short = 'c')]
    pub config_override: Option<PathBuf>,
    /// config file must exist, including "config_override" files
    #[argh(switch, short = 'r')]
    pub config_required: bool,
    /// write the effective config (including overrides below) to the config file
    #[argh(switch)]
    pub save_config: bool,
    /// seconds to scan for a monitor before giving up
    #[argh(option, short = 's')]
    pub scan_timeout: Option<f64>,
    /// seconds to wait for the connection to be established
    #[argh(option, short = 't')]
    pub connect_timeout: Option<f64>,
    /// also print RR intervals when the monitor sends them
    #[argh(switch)]
    pub rr: bool,
}

impl TopLevelCmd {
    /// Command line options win over the config file.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(secs) = self.scan_timeout {
            settings.ble.scan_timeout_secs = secs;
        }
        if let Some(secs) = self.connect_timeout {
            settings.ble.connect_timeout_secs = secs;
        }
        if self.rr {
            settings.misc.report_rr_intervals = true;
        }
    }
}
