use thiserror::Error;

// Heart Rate Measurement (0x2A37) flag bits
const HR_FORMAT_U16: u8 = 1 << 0;
const SENSOR_CONTACT_STATUS: u8 = 1 << 1;
const SENSOR_CONTACT_SUPPORTED: u8 = 1 << 2;
const ENERGY_EXPENDED_PRESENT: u8 = 1 << 3;
const RR_INTERVAL_PRESENT: u8 = 1 << 4;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Empty measurement packet")]
    Empty,
    #[error("Measurement packet too short (expected {expected} bytes, got {actual})")]
    Truncated { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SensorContact {
    #[default]
    NotSupported,
    NotDetected,
    Detected,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Measurement {
    pub bpm: u16,
    pub sensor_contact: SensorContact,
    /// Cumulative kilojoules, if the monitor reports it
    pub energy_expended: Option<u16>,
    /// `None` when the packet doesn't carry RR data at all,
    /// `Some(vec![])` when the flag is set but no full entry followed
    pub rr_intervals: Option<Vec<u16>>,
}

/// Decodes a raw Heart Rate Measurement notification.
///
/// RR intervals are converted from 1/1024 second ticks to whole milliseconds.
/// A trailing odd byte at the end of the RR section is ignored.
pub fn parse_hrm(data: &[u8]) -> Result<Measurement, DecodeError> {
    let (&flags, rest) = data.split_first().ok_or(DecodeError::Empty)?;

    let hr_width = if flags & HR_FORMAT_U16 != 0 { 2 } else { 1 };
    if rest.len() < hr_width {
        return Err(DecodeError::Truncated {
            expected: hr_width + 1,
            actual: data.len(),
        });
    }
    let (hr_bytes, mut rest) = rest.split_at(hr_width);
    let bpm = match *hr_bytes {
        [lo, hi] => u16::from_le_bytes([lo, hi]),
        [value] => value as u16,
        _ => unreachable!("heart rate field is one or two bytes"),
    };

    let sensor_contact = if flags & SENSOR_CONTACT_SUPPORTED == 0 {
        SensorContact::NotSupported
    } else if flags & SENSOR_CONTACT_STATUS != 0 {
        SensorContact::Detected
    } else {
        SensorContact::NotDetected
    };

    let mut energy_expended = None;
    if flags & ENERGY_EXPENDED_PRESENT != 0 {
        if let Some((energy, remaining)) = split_u16(rest) {
            energy_expended = Some(energy);
            rest = remaining;
        } else {
            rest = &[];
        }
    }

    let rr_intervals = (flags & RR_INTERVAL_PRESENT != 0).then(|| {
        rest.chunks_exact(2)
            .map(|chunk| ticks_to_millis(u16::from_le_bytes([chunk[0], chunk[1]])))
            .collect()
    });

    Ok(Measurement {
        bpm,
        sensor_contact,
        energy_expended,
        rr_intervals,
    })
}

fn split_u16(data: &[u8]) -> Option<(u16, &[u8])> {
    match data {
        [lo, hi, rest @ ..] => Some((u16::from_le_bytes([*lo, *hi]), rest)),
        _ => None,
    }
}

fn ticks_to_millis(ticks: u16) -> u16 {
    (ticks as f64 / 1024.0 * 1000.0).round() as u16
}
