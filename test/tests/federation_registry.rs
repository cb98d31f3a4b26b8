//! Creating, joining and destroying federation executions through the
//! registry.

use std::sync::Arc;

use rti_server::{FederationInfo, FederationsList};
use rti_shared::{FederationHandle, LinkKey, NetworkMessage, RtiError};
use rti_test::{vehicle_model, RecordingSink, TestFederation, POSITION, VEHICLE};

fn registry(max_federations: usize) -> (FederationsList, Arc<RecordingSink>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let sink = Arc::new(RecordingSink::new());
    let list = FederationsList::new(vehicle_model(), sink.clone(), max_federations, 4);
    (list, sink)
}

#[test]
fn duplicate_name_is_refused_and_size_unchanged() {
    let (list, _) = registry(8);
    list.create_federation("exercise", FederationHandle::new(1))
        .unwrap();
    assert_eq!(list.len(), 1);

    let error = list
        .create_federation("exercise", FederationHandle::new(2))
        .unwrap_err();
    assert_eq!(
        error,
        RtiError::FederationExecutionAlreadyExists {
            name: "exercise".to_string()
        }
    );
    assert_eq!(list.len(), 1);
    assert!(matches!(
        list.create("exercise"),
        Err(RtiError::FederationExecutionAlreadyExists { .. })
    ));
    assert_eq!(list.len(), 1);
}

#[test]
fn destroy_while_joined_is_refused_and_federation_kept() {
    let mut test = TestFederation::new();
    let federate = test.join("pilot");
    let before = test.list.info(test.handle).unwrap();

    assert_eq!(
        test.list.destroy_federation(test.handle),
        Err(RtiError::FederatesCurrentlyJoined {
            federation: test.handle,
            count: 1
        })
    );
    assert_eq!(test.list.len(), 1);
    assert_eq!(test.list.exists("test"), Ok(test.handle));
    assert_eq!(test.list.info(test.handle).unwrap(), before);

    test.list.remove(test.handle, federate).unwrap();
    test.list.destroy_federation(test.handle).unwrap();
    assert!(test.list.is_empty());
    assert!(matches!(
        test.list.info(test.handle),
        Err(RtiError::FederationExecutionDoesNotExist { .. })
    ));
}

#[test]
fn capacity_and_empty_names_are_preconditions() {
    let (list, _) = registry(2);
    list.create("a").unwrap();
    list.create("b").unwrap();
    let error = list.create("c").unwrap_err();
    assert_eq!(error.name(), "RTIinternalError");
    assert_eq!(list.len(), 2);
    assert_eq!(list.create("").unwrap_err().name(), "RTIinternalError");
    assert_eq!(list.exists("").unwrap_err().name(), "RTIinternalError");
}

#[test]
fn federations_do_not_share_declarations() {
    let (list, sink) = registry(4);
    let first = list.create("first").unwrap();
    let second = list.create("second").unwrap();
    let publisher = list.add_federate(first, "publisher", LinkKey::new(1)).unwrap();
    let subscriber = list.add_federate(second, "subscriber", LinkKey::new(2)).unwrap();

    list.subscribe_object(second, subscriber, VEHICLE, &[POSITION], true)
        .unwrap();
    list.publish_object(first, publisher, VEHICLE, &[POSITION], true)
        .unwrap();
    list.register_object(first, publisher, VEHICLE, None).unwrap();
    assert!(sink.take_for(LinkKey::new(2)).is_empty());

    assert!(matches!(
        list.register_object(second, subscriber, VEHICLE, None),
        Err(RtiError::ObjectClassNotPublished { .. })
    ));
}

#[test]
fn joining_twice_or_when_full_fails() {
    let (list, _) = registry(1);
    let handle = list.create("full").unwrap();
    for index in 0..4u64 {
        list.add_federate(handle, &format!("f{}", index), LinkKey::new(index + 1))
            .unwrap();
    }
    assert!(matches!(
        list.add_federate(handle, "f0", LinkKey::new(10)),
        Err(RtiError::FederateAlreadyExecutionMember { .. })
    ));
    assert!(matches!(
        list.add_federate(handle, "f4", LinkKey::new(10)),
        Err(RtiError::MemoryExhausted { .. })
    ));
    assert_eq!(
        list.info(handle).unwrap(),
        FederationInfo {
            federates: 4,
            regulators: 0,
            paused: false
        }
    );
}

#[test]
fn killing_is_total_and_frees_the_federation() {
    let mut test = TestFederation::new();
    let crashed = test.join("crashed");
    let survivor = test.join("survivor");
    test.list
        .subscribe_object(test.handle, survivor, VEHICLE, &[POSITION], true)
        .unwrap();
    test.list
        .publish_object(test.handle, crashed, VEHICLE, &[POSITION], true)
        .unwrap();
    let (object, _) = test
        .list
        .register_object(test.handle, crashed, VEHICLE, None)
        .unwrap();
    test.received(survivor);

    test.list.kill_federate(test.handle, crashed);
    test.list.kill_federate(test.handle, crashed);
    test.list
        .kill_federate(FederationHandle::new(42), crashed);

    assert_eq!(
        test.received(survivor),
        vec![NetworkMessage::RemoveObject {
            object,
            tag: String::new()
        }]
    );
    test.list.remove(test.handle, survivor).unwrap();
    test.list.destroy_federation(test.handle).unwrap();
}

#[test]
fn newcomers_catch_up_with_time_and_pause_state() {
    let mut test = TestFederation::new();
    let regulator = test.join("regulator");
    test.list
        .create_regulator(test.handle, regulator, 12.5)
        .unwrap();
    test.list
        .set_pause(test.handle, regulator, true, "briefing")
        .unwrap();
    let late = test.join("late");

    assert_eq!(
        test.received(late),
        vec![
            NetworkMessage::NullMessage {
                federate: regulator,
                time: 12.5
            },
            NetworkMessage::RequestPause {
                label: "briefing".to_string()
            },
        ]
    );
    assert_eq!(
        test.list.info(test.handle).unwrap(),
        FederationInfo {
            federates: 2,
            regulators: 1,
            paused: true
        }
    );
}
