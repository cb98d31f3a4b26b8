//! Several threads driving the same registry: subscriptions racing
//! registrations and updates still discover every instance exactly once.

use std::{
    collections::BTreeMap,
    sync::{Barrier, Mutex},
    thread,
};

use rti_shared::{LinkKey, NetworkMessage, ObjectClassHandle, ObjectHandle};
use rti_test::{
    TestFederation, CAR, OBJECT_ROOT, POSITION, PRIVILEGE_TO_DELETE, SHIP, VEHICLE, WHEELS,
};

const CARS: usize = 40;
const SHIPS: usize = 25;

/// Discoveries per object, checking that nothing is reflected before it is
/// discovered
fn discoveries(messages: &[NetworkMessage]) -> BTreeMap<ObjectHandle, Vec<ObjectClassHandle>> {
    let mut discovered: BTreeMap<ObjectHandle, Vec<ObjectClassHandle>> = BTreeMap::new();
    for message in messages {
        match message {
            NetworkMessage::DiscoverObject { object, class, .. } => {
                discovered.entry(*object).or_default().push(*class);
            }
            NetworkMessage::ReflectAttributeValues { object, .. } => {
                assert!(
                    discovered.contains_key(object),
                    "object {} reflected before discovery",
                    object
                );
            }
            _ => {}
        }
    }
    discovered
}

#[test]
fn racing_subscribers_discover_each_instance_once() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut test = TestFederation::new();
    let driver = test.join("driver");
    let root_watcher = test.join("root watcher");
    let vehicle_watcher = test.join("vehicle watcher");
    let car_watcher = test.join("car watcher");
    let narrowing_watcher = test.join("narrowing watcher");
    test.list
        .publish_object(test.handle, driver, CAR, &[POSITION, WHEELS], true)
        .unwrap();

    let other = test.list.create("harbour").unwrap();
    let captain = test
        .list
        .add_federate(other, "captain", LinkKey::new(100))
        .unwrap();
    let spotter = test
        .list
        .add_federate(other, "spotter", LinkKey::new(101))
        .unwrap();
    test.list
        .publish_object(other, captain, SHIP, &[POSITION], true)
        .unwrap();
    test.list
        .subscribe_object(other, spotter, VEHICLE, &[POSITION], true)
        .unwrap();

    let list = &test.list;
    let handle = test.handle;
    let barrier = Barrier::new(6);
    let cars = Mutex::new(Vec::new());
    thread::scope(|scope| {
        scope.spawn(|| {
            barrier.wait();
            for index in 0..CARS {
                let (car, _) = list.register_object(handle, driver, CAR, None).unwrap();
                let values = vec![(POSITION, vec![index as u8])];
                list.update_attribute(handle, driver, car, values, 0.0, "")
                    .unwrap();
                cars.lock().unwrap().push(car);
            }
        });
        for (watcher, class, attribute) in [
            (root_watcher, OBJECT_ROOT, PRIVILEGE_TO_DELETE),
            (vehicle_watcher, VEHICLE, POSITION),
            (car_watcher, CAR, WHEELS),
        ] {
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                list.subscribe_object(handle, watcher, class, &[attribute], true)
                    .unwrap();
            });
        }
        scope.spawn(|| {
            barrier.wait();
            list.subscribe_object(handle, narrowing_watcher, VEHICLE, &[POSITION], true)
                .unwrap();
            thread::yield_now();
            list.subscribe_object(handle, narrowing_watcher, CAR, &[WHEELS], true)
                .unwrap();
        });
        scope.spawn(|| {
            barrier.wait();
            for index in 0..SHIPS {
                let (ship, _) = list.register_object(other, captain, SHIP, None).unwrap();
                let values = vec![(POSITION, vec![index as u8])];
                list.update_attribute(other, captain, ship, values, 0.0, "")
                    .unwrap();
            }
        });
    });

    let cars = cars.into_inner().unwrap();
    assert_eq!(cars.len(), CARS);
    for (watcher, class) in [
        (root_watcher, OBJECT_ROOT),
        (vehicle_watcher, VEHICLE),
        (car_watcher, CAR),
    ] {
        let discovered = discoveries(&test.received(watcher));
        assert_eq!(discovered.len(), CARS, "watcher {}", watcher);
        for car in &cars {
            assert_eq!(discovered.get(car), Some(&vec![class]), "watcher {}", watcher);
        }
    }
    let discovered = discoveries(&test.received(narrowing_watcher));
    assert_eq!(discovered.len(), CARS);
    assert!(discovered.values().all(|classes| classes.len() == 1));

    let sightings = discoveries(&test.sink.take_for(LinkKey::new(101)));
    assert_eq!(sightings.len(), SHIPS);
    assert!(sightings.values().all(|classes| classes == &vec![VEHICLE]));
    assert!(test.sink.take_for(LinkKey::new(100)).is_empty());
}
