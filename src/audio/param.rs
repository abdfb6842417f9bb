use super::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Automation {
    SetValue { time: Timestamp, value: f32 },
    LinearRamp { time: Timestamp, value: f32 },
}

impl Automation {
    fn time(&self) -> Timestamp {
        match self {
            Automation::SetValue { time, .. } | Automation::LinearRamp { time, .. } => *time,
        }
    }

    fn value(&self) -> f32 {
        match self {
            Automation::SetValue { value, .. } | Automation::LinearRamp { value, .. } => *value,
        }
    }
}

/// A gain value with a timeline of scheduled changes.
///
/// A ramp runs from the previous event's time and value to its own; with
/// no previous event it starts from the default value at time zero.
#[derive(Debug, Clone)]
pub struct GainParam {
    default: f32,
    events: Vec<Automation>,
}

impl GainParam {
    pub fn new(default: f32) -> Self {
        Self {
            default,
            events: Vec::new(),
        }
    }

    pub fn set_value_at_time(&mut self, value: f32, time: Timestamp) {
        self.insert(Automation::SetValue { time, value });
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: Timestamp) {
        self.insert(Automation::LinearRamp {
            time: end_time,
            value,
        });
    }

    /// Drops every event scheduled at or after `time`.
    pub fn cancel_scheduled_values(&mut self, time: Timestamp) {
        self.events.retain(|event| event.time() < time);
    }

    pub fn value_at(&self, t: Timestamp) -> f32 {
        let mut from = (0.0, self.default);

        for event in &self.events {
            if event.time() <= t {
                from = (event.time(), event.value());
                continue;
            }
            return match *event {
                Automation::LinearRamp { time, value } if time > from.0 => {
                    let progress = ((t - from.0) / (time - from.0)) as f32;
                    from.1 + (value - from.1) * progress
                }
                _ => from.1,
            };
        }

        from.1
    }

    /// Time of the last scheduled event, if any.
    pub fn end_time(&self) -> Option<Timestamp> {
        self.events.last().map(Automation::time)
    }

    fn insert(&mut self, event: Automation) {
        let index = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(index, event);
    }
}

impl Default for GainParam {
    fn default() -> Self {
        Self::new(1.0)
    }
}
