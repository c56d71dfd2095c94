//! Sensor → actuator routing over the typed value bus.
//!
//! A [`Route`] connects one stimulus (optionally one component of a tuple
//! reading) to one driver.  [`RouteTable::connect`] validates the route
//! against the declared producer and consumer types before recording it; on
//! every tick [`RouteTable::apply`] reads each producer, merges fan-in with
//! the consumer type's combiner and writes the result into the driver.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use synthsim_types::{SimError, Value, ValueType};
use tracing::{debug, info};

use crate::catalog::{DriverSet, StimulusSet};

/// One edge of the routing graph, addressed by canonical identity keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub producer: String,
    /// Tuple component to extract, or `None` to forward the whole reading.
    #[serde(default)]
    pub component: Option<usize>,
    pub consumer: String,
}

impl Route {
    pub fn new(producer: impl Into<String>, consumer: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            component: None,
            consumer: consumer.into(),
        }
    }

    pub fn with_component(mut self, index: usize) -> Self {
        self.component = Some(index);
        self
    }
}

/// Validated routes, grouped by consumer key.
#[derive(Debug, Default)]
pub struct RouteTable {
    inputs: BTreeMap<String, Vec<(String, Option<usize>)>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and record `route`.  Connecting an identical route twice is a
    /// no-op.
    pub fn connect(
        &mut self,
        route: Route,
        stimuli: &StimulusSet,
        drivers: &DriverSet,
    ) -> Result<(), SimError> {
        let producer = stimuli
            .get(&route.producer)
            .ok_or_else(|| SimError::UnknownStimulus(route.producer.clone()))?;
        let consumer = drivers
            .get(&route.consumer)
            .ok_or_else(|| SimError::UnknownDriver(route.consumer.clone()))?;

        let supplied = producer.supplier_type();
        let produced = match route.component {
            None => supplied,
            Some(index) => {
                let parts = supplied.decompose().ok_or(SimError::NotATuple(supplied))?;
                *parts.get(index).ok_or(SimError::ComponentOutOfRange {
                    index,
                    value_type: supplied,
                })?
            }
        };

        let wanted = consumer.consumer_type();
        if produced != wanted {
            return Err(SimError::TypeMismatch {
                producer: produced,
                consumer: wanted,
            });
        }

        let entry = (route.producer.clone(), route.component);
        let inputs = self.inputs.entry(route.consumer.clone()).or_default();
        if inputs.contains(&entry) {
            return Ok(());
        }
        if !inputs.is_empty() && wanted.combiner().is_none() {
            return Err(SimError::NoCombiner(wanted));
        }
        inputs.push(entry);
        info!(
            producer = %route.producer,
            consumer = %route.consumer,
            component = ?route.component,
            "route connected"
        );
        Ok(())
    }

    /// Remove every route feeding `consumer`.  Returns how many were removed.
    pub fn disconnect(&mut self, consumer: &str) -> usize {
        self.inputs.remove(consumer).map_or(0, |v| v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Number of individual routes across all consumers.
    pub fn len(&self) -> usize {
        self.inputs.values().map(Vec::len).sum()
    }

    /// Producers currently feeding `consumer`.
    /// Driver keys that receive at least one route.
    pub fn consumers(&self) -> impl Iterator<Item = &str> {
        self.inputs.keys().map(String::as_str)
    }

    pub fn inputs_of(&self, consumer: &str) -> &[(String, Option<usize>)] {
        self.inputs.get(consumer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Push every routed reading into its consumer.
    pub fn apply(&self, stimuli: &StimulusSet, drivers: &mut DriverSet) {
        for (consumer_key, inputs) in &self.inputs {
            let Some(consumer) = drivers.get_mut(consumer_key) else {
                debug!(consumer = %consumer_key, "routed consumer no longer present");
                continue;
            };

            let values: Vec<Value> = inputs
                .iter()
                .filter_map(|(producer, component)| {
                    let reading = stimuli.get(producer)?.supplier_value();
                    match component {
                        Some(i) => reading.component(*i),
                        None => Some(reading),
                    }
                })
                .collect();

            let merged = match values.as_slice() {
                [] => continue,
                [single] => *single,
                many => match consumer.consumer_type().combiner() {
                    Some(combine) => combine(many),
                    None => continue,
                },
            };
            consumer.set_value(merged);
        }
    }

}

/// Value type of a route's producer side, resolved against `stimuli`.
pub fn produced_type(route: &Route, stimuli: &StimulusSet) -> Option<ValueType> {
    let supplied = stimuli.get(&route.producer)?.supplier_type();
    match route.component {
        None => Some(supplied),
        Some(i) => supplied.decompose()?.get(i).copied(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::driver::Driver;
    use crate::physics::PhysicsJoint;
    use crate::sim::SimJoint;
    use crate::stimulus::{JointStimulus, Stimulus};
    use synthsim_types::{DriverId, DriverKind, StimulusId, StimulusKind};

    /// Scalar driver that just remembers the last command.
    struct Recorder {
        id: DriverId,
        command: f32,
    }

    impl Driver for Recorder {
        fn id(&self) -> &DriverId {
            &self.id
        }
        fn set_command(&mut self, value: f32) {
            self.command = value;
        }
        fn command(&self) -> f32 {
            self.command
        }
        fn update(&mut self, _dt: f32) {}
    }

    /// Driver consuming a whole pair reading.
    struct PairSink {
        id: DriverId,
        last: Option<Value>,
    }

    impl Driver for PairSink {
        fn id(&self) -> &DriverId {
            &self.id
        }
        fn set_command(&mut self, _value: f32) {}
        fn command(&self) -> f32 {
            self.last
                .and_then(|v| v.component(0))
                .and_then(|v| v.as_number())
                .unwrap_or(0.0)
        }
        fn update(&mut self, _dt: f32) {}
        fn consumer_type(&self) -> ValueType {
            ValueType::Pair
        }
        fn set_value(&mut self, value: Value) {
            self.last = Some(value);
        }
    }

    fn recorder(guid: &str) -> Box<dyn Driver> {
        Box::new(Recorder {
            id: DriverId::new(DriverKind::Hinge, None, guid),
            command: 0.0,
        })
    }

    fn sensor(guid: &str, position: f32, velocity: f32) -> (Box<JointStimulus>, String) {
        let joint = Rc::new(RefCell::new(SimJoint::default()));
        joint.borrow_mut().set_position(position);
        joint.borrow_mut().drive_velocity(velocity);
        let id = StimulusId::new(StimulusKind::Slider, None, guid);
        let key = id.key();
        let mut stim = JointStimulus::new(id, joint);
        stim.update(0.1);
        (Box::new(stim), key)
    }

    fn fixture() -> (StimulusSet, DriverSet, String, String, String) {
        let mut stimuli = StimulusSet::new();
        let (a, a_key) = sensor("a", 0.25, 1.0);
        let (b, b_key) = sensor("b", 0.5, -2.0);
        stimuli.add(a);
        stimuli.add(b);
        let mut drivers = DriverSet::new();
        let out = recorder("out");
        let out_key = out.id().key();
        drivers.add(out);
        (stimuli, drivers, a_key, b_key, out_key)
    }

    #[test]
    fn component_route_forwards_scalar() {
        let (stimuli, mut drivers, a, _, out) = fixture();
        let mut table = RouteTable::new();
        table
            .connect(Route::new(&a, &out).with_component(0), &stimuli, &drivers)
            .unwrap();
        table.apply(&stimuli, &mut drivers);
        assert_eq!(drivers.get(&out).unwrap().command(), 0.25);
    }

    #[test]
    fn scalar_fan_in_is_summed() {
        let (stimuli, mut drivers, a, b, out) = fixture();
        let mut table = RouteTable::new();
        table
            .connect(Route::new(&a, &out).with_component(1), &stimuli, &drivers)
            .unwrap();
        table
            .connect(Route::new(&b, &out).with_component(1), &stimuli, &drivers)
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.consumers().collect::<Vec<_>>(), vec![out.as_str()]);
        table.apply(&stimuli, &mut drivers);
        assert!((drivers.get(&out).unwrap().command() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn whole_pair_into_scalar_is_a_mismatch() {
        let (stimuli, drivers, a, _, out) = fixture();
        let err = RouteTable::new()
            .connect(Route::new(&a, &out), &stimuli, &drivers)
            .unwrap_err();
        assert_eq!(
            err,
            SimError::TypeMismatch {
                producer: ValueType::Pair,
                consumer: ValueType::Scalar,
            }
        );
    }

    #[test]
    fn component_out_of_range_is_rejected() {
        let (stimuli, drivers, a, _, out) = fixture();
        let err = RouteTable::new()
            .connect(Route::new(&a, &out).with_component(2), &stimuli, &drivers)
            .unwrap_err();
        assert_eq!(
            err,
            SimError::ComponentOutOfRange {
                index: 2,
                value_type: ValueType::Pair,
            }
        );
    }

    #[test]
    fn unknown_endpoints_are_rejected() {
        let (stimuli, drivers, a, _, out) = fixture();
        let mut table = RouteTable::new();
        assert!(matches!(
            table.connect(Route::new("nope", &out), &stimuli, &drivers),
            Err(SimError::UnknownStimulus(_))
        ));
        assert!(matches!(
            table.connect(Route::new(&a, "nope"), &stimuli, &drivers),
            Err(SimError::UnknownDriver(_))
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn pair_consumer_is_single_producer() {
        let (stimuli, mut drivers, a, b, _) = fixture();
        let sink_id = DriverId::new(DriverKind::Slider, None, "sink");
        let sink_key = sink_id.key();
        drivers.add(Box::new(PairSink {
            id: sink_id,
            last: None,
        }));

        let mut table = RouteTable::new();
        table
            .connect(Route::new(&a, &sink_key), &stimuli, &drivers)
            .unwrap();
        // Same route again is accepted without duplicating.
        table
            .connect(Route::new(&a, &sink_key), &stimuli, &drivers)
            .unwrap();
        assert_eq!(table.inputs_of(&sink_key).len(), 1);

        let err = table
            .connect(Route::new(&b, &sink_key), &stimuli, &drivers)
            .unwrap_err();
        assert_eq!(err, SimError::NoCombiner(ValueType::Pair));
        assert_eq!(
            produced_type(&Route::new(&a, &sink_key), &stimuli),
            Some(ValueType::Pair)
        );
        table.apply(&stimuli, &mut drivers);
        assert_eq!(drivers.get(&sink_key).unwrap().command(), 0.25);
    }

    #[test]
    fn disconnect_removes_all_inputs() {
        let (stimuli, drivers, a, b, out) = fixture();
        let mut table = RouteTable::new();
        table
            .connect(Route::new(&a, &out).with_component(0), &stimuli, &drivers)
            .unwrap();
        table
            .connect(Route::new(&b, &out).with_component(0), &stimuli, &drivers)
            .unwrap();
        assert_eq!(table.disconnect(&out), 2);
        assert_eq!(table.disconnect(&out), 0);
        assert!(table.is_empty());
    }
}
