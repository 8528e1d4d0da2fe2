//! Event sinks for following a run step by step

use std::fs::File;
use std::path::Path;

use csv::Writer;

use pelca::{Event, EventSink, RenewalTrigger, RuIndex, TimeStep, TrialIndex};

// ============================================================================
// Console Logging Sink
// ============================================================================

/// Prints events of selected trials to the console
pub struct ConsoleEventSink {
    /// Only events of trials below this index are printed
    max_trial: TrialIndex,
    unit_names: Vec<String>,
}

impl ConsoleEventSink {
    pub fn new(max_trial: TrialIndex, unit_names: Vec<String>) -> Self {
        Self { max_trial, unit_names }
    }

    fn name(&self, ru: RuIndex) -> &str {
        self.unit_names.get(ru).map(String::as_str).unwrap_or("?")
    }
}

impl EventSink for ConsoleEventSink {
    fn log(&mut self, step: TimeStep, trial: TrialIndex, event: Event) {
        if trial >= self.max_trial {
            return;
        }

        match event {
            Event::Fault {
                ru,
                cause,
                age,
                scheduled,
            } => {
                println!(
                    "{:>5} {:>4} Fault        {:<20} cause:{} age:{}{}",
                    step,
                    trial,
                    self.name(ru),
                    cause,
                    age,
                    if scheduled { " (scheduled)" } else { "" }
                );
            }
            Event::MaintenanceDue { ru, age } => {
                println!("{:>5} {:>4} Maintenance  {:<20} age:{}", step, trial, self.name(ru), age);
            }
            Event::Renewed { ru, trigger, indicator } => {
                println!(
                    "{:>5} {:>4} Renewed      {:<20} by:{:?} indicator:{:.2}",
                    step,
                    trial,
                    self.name(ru),
                    trigger,
                    indicator
                );
            }
        }
    }
}

// ============================================================================
// CSV Event Sink
// ============================================================================

/// CSV event sink for structured data export
pub struct CsvEventSink {
    writer: Writer<File>,
}

impl CsvEventSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, csv::Error> {
        let mut writer = Writer::from_path(path)?;
        writer.write_record(["step", "trial", "event_type", "ru", "detail", "value"])?;
        Ok(Self { writer })
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl EventSink for CsvEventSink {
    fn log(&mut self, step: TimeStep, trial: TrialIndex, event: Event) {
        let (event_type, ru, detail, value) = match event {
            Event::Fault {
                ru,
                cause,
                age,
                scheduled,
            } => (
                "Fault",
                ru,
                if scheduled { format!("{} scheduled", cause) } else { cause.to_string() },
                age as f64,
            ),
            Event::MaintenanceDue { ru, age } => ("Maintenance", ru, String::new(), age as f64),
            Event::Renewed { ru, trigger, indicator } => {
                let detail = match trigger {
                    RenewalTrigger::Fault => "fault",
                    RenewalTrigger::Maintenance => "maintenance",
                };
                ("Renewed", ru, detail.to_string(), indicator)
            }
        };

        let result = self.writer.write_record([
            step.to_string(),
            trial.to_string(),
            event_type.to_string(),
            ru.to_string(),
            detail,
            value.to_string(),
        ]);
        if let Err(e) = result {
            eprintln!("Error writing to CSV: {}", e);
        }
    }
}

impl Drop for CsvEventSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

// ============================================================================
// Collector Event Sink (In-Memory)
// ============================================================================

/// Collects events in memory for programmatic analysis
#[derive(Default)]
pub struct CollectorEventSink {
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone)]
pub struct EventRecord {
    pub step: TimeStep,
    pub trial: TrialIndex,
    pub event: Event,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct EventTypeCounts {
    pub faults: usize,
    pub scheduled_faults: usize,
    pub maintenance: usize,
    pub renewals: usize,
}

impl CollectorEventSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn faults(&self) -> impl Iterator<Item = &EventRecord> {
        self.events
            .iter()
            .filter(|e| matches!(e.event, Event::Fault { .. }))
    }

    pub fn for_trial(&self, trial: TrialIndex) -> impl Iterator<Item = &EventRecord> {
        self.events.iter().filter(move |e| e.trial == trial)
    }

    pub fn count_by_type(&self) -> EventTypeCounts {
        let mut counts = EventTypeCounts::default();
        for record in &self.events {
            match record.event {
                Event::Fault { scheduled, .. } => {
                    counts.faults += 1;
                    if scheduled {
                        counts.scheduled_faults += 1;
                    }
                }
                Event::MaintenanceDue { .. } => counts.maintenance += 1,
                Event::Renewed { .. } => counts.renewals += 1,
            }
        }
        counts
    }

    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), csv::Error> {
        let mut csv_sink = CsvEventSink::new(path)?;
        for record in &self.events {
            csv_sink.log(record.step, record.trial, record.event.clone());
        }
        csv_sink.flush()?;
        Ok(())
    }
}

impl EventSink for CollectorEventSink {
    fn log(&mut self, step: TimeStep, trial: TrialIndex, event: Event) {
        self.events.push(EventRecord { step, trial, event });
    }
}
