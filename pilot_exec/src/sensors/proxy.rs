//! Runtime selection between the simulated and real sensor sources

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;

use super::{SensorEvent, SensorSource};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Forwards polls to either the simulated or the real source.
///
/// Switching source restarts the newly selected one so that it doesn't
/// deliver a backlog of stale samples.
pub struct SourceProxy {
    simulated: Box<dyn SensorSource>,
    real: Box<dyn SensorSource>,
    simulation: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SourceProxy {
    pub fn new(
        simulated: Box<dyn SensorSource>,
        real: Box<dyn SensorSource>,
        simulation: bool,
    ) -> Self {
        Self {
            simulated,
            real,
            simulation,
        }
    }

    pub fn simulation(&self) -> bool {
        self.simulation
    }

    /// Select the simulated (`true`) or real (`false`) source.
    pub fn set_simulation(&mut self, simulation: bool) {
        if simulation == self.simulation {
            return;
        }

        self.simulation = simulation;
        self.active().reset();
        info!("Sensor source switched to {}", self.active_name());
    }

    pub fn active_name(&self) -> &'static str {
        if self.simulation {
            self.simulated.name()
        } else {
            self.real.name()
        }
    }

    fn active(&mut self) -> &mut dyn SensorSource {
        if self.simulation {
            self.simulated.as_mut()
        } else {
            self.real.as_mut()
        }
    }
}

impl SensorSource for SourceProxy {
    fn poll(&mut self, now_s: f64) -> Vec<SensorEvent> {
        self.active().poll(now_s)
    }

    fn reset(&mut self) {
        self.active().reset();
    }

    fn name(&self) -> &'static str {
        "proxy"
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::HeadingSample;
    use std::{cell::Cell, rc::Rc};

    /// Emits one heading per poll equal to its id, and counts resets.
    struct Fake {
        id: f64,
        resets: Rc<Cell<usize>>,
    }

    impl SensorSource for Fake {
        fn poll(&mut self, now_s: f64) -> Vec<SensorEvent> {
            vec![SensorEvent::Heading(HeadingSample::new(self.id, now_s))]
        }

        fn reset(&mut self) {
            self.resets.set(self.resets.get() + 1);
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn heading_of(events: &[SensorEvent]) -> f64 {
        match events[0] {
            SensorEvent::Heading(h) => h.heading_deg,
            _ => panic!("Expected a heading"),
        }
    }

    #[test]
    fn test_switching_resets_new_source() {
        let sim_resets = Rc::new(Cell::new(0));
        let real_resets = Rc::new(Cell::new(0));

        let mut proxy = SourceProxy::new(
            Box::new(Fake { id: 1.0, resets: sim_resets.clone() }),
            Box::new(Fake { id: 2.0, resets: real_resets.clone() }),
            true,
        );

        assert_eq!(heading_of(&proxy.poll(0.0)), 1.0);

        // No change, no reset
        proxy.set_simulation(true);
        assert_eq!(sim_resets.get(), 0);

        proxy.set_simulation(false);
        assert_eq!(real_resets.get(), 1);
        assert_eq!(heading_of(&proxy.poll(1.0)), 2.0);

        proxy.set_simulation(true);
        assert_eq!(sim_resets.get(), 1);
        assert_eq!(heading_of(&proxy.poll(2.0)), 1.0);
    }
}
