//! Updates and interactions climb the class tree, reaching each interested
//! federate exactly once.

use rti_shared::{AttributeValue, FederateHandle, NetworkMessage, ObjectHandle};
use rti_test::{
    TestFederation, CAR, COLLISION, FORCE, INTERACTION_ROOT, OBJECT_ROOT, POSITION,
    PRIVILEGE_TO_DELETE, SHIP, VEHICLE, WHEELS,
};

struct Scene {
    test: TestFederation,
    driver: FederateHandle,
    at_car: FederateHandle,
    at_vehicle: FederateHandle,
    at_root: FederateHandle,
    at_ship: FederateHandle,
    car: ObjectHandle,
}

fn scene() -> Scene {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut test = TestFederation::new();
    let driver = test.join("driver");
    let at_car = test.join("at_car");
    let at_vehicle = test.join("at_vehicle");
    let at_root = test.join("at_root");
    let at_ship = test.join("at_ship");

    let list = &test.list;
    let handle = test.handle;
    list.subscribe_object(handle, at_car, CAR, &[WHEELS], true)
        .unwrap();
    list.subscribe_object(handle, at_vehicle, VEHICLE, &[POSITION], true)
        .unwrap();
    list.subscribe_object(handle, at_root, OBJECT_ROOT, &[PRIVILEGE_TO_DELETE], true)
        .unwrap();
    list.subscribe_object(handle, at_ship, SHIP, &[POSITION], true)
        .unwrap();
    list.publish_object(
        handle,
        driver,
        CAR,
        &[PRIVILEGE_TO_DELETE, POSITION, WHEELS],
        true,
    )
    .unwrap();
    let (car, _) = list.register_object(handle, driver, CAR, None).unwrap();
    test.sink.clear();

    Scene {
        test,
        driver,
        at_car,
        at_vehicle,
        at_root,
        at_ship,
        car,
    }
}

fn reflect(object: ObjectHandle, values: Vec<AttributeValue>) -> NetworkMessage {
    NetworkMessage::ReflectAttributeValues {
        object,
        values,
        time: 3.0,
        tag: "tick".to_string(),
    }
}

#[test]
fn update_reaches_every_level_once() {
    let scene = scene();
    let values = vec![
        (PRIVILEGE_TO_DELETE, vec![0]),
        (POSITION, vec![1, 2]),
        (WHEELS, vec![4]),
    ];
    scene
        .test
        .list
        .update_attribute(scene.test.handle, scene.driver, scene.car, values, 3.0, "tick")
        .unwrap();

    assert_eq!(
        scene.test.received(scene.at_car),
        vec![reflect(scene.car, vec![(WHEELS, vec![4])])]
    );
    assert_eq!(
        scene.test.received(scene.at_vehicle),
        vec![reflect(scene.car, vec![(POSITION, vec![1, 2])])]
    );
    assert_eq!(
        scene.test.received(scene.at_root),
        vec![reflect(scene.car, vec![(PRIVILEGE_TO_DELETE, vec![0])])]
    );
    assert!(scene.test.received(scene.at_ship).is_empty());
    assert!(scene.test.received(scene.driver).is_empty());
    assert!(scene.test.sink.is_empty());
}

#[test]
fn only_federates_interested_in_the_updated_attributes_hear_it() {
    let scene = scene();
    scene
        .test
        .list
        .update_attribute(
            scene.test.handle,
            scene.driver,
            scene.car,
            vec![(POSITION, vec![9])],
            3.0,
            "tick",
        )
        .unwrap();

    assert_eq!(
        scene.test.received(scene.at_vehicle),
        vec![reflect(scene.car, vec![(POSITION, vec![9])])]
    );
    assert!(scene.test.sink.is_empty());
}

#[test]
fn a_federate_subscribed_at_two_levels_gets_one_merged_reflect() {
    let scene = scene();
    let list = &scene.test.list;
    list.subscribe_object(scene.test.handle, scene.at_car, VEHICLE, &[POSITION], true)
        .unwrap();
    scene.test.sink.clear();

    list.update_attribute(
        scene.test.handle,
        scene.driver,
        scene.car,
        vec![(POSITION, vec![5]), (WHEELS, vec![3])],
        3.0,
        "tick",
    )
    .unwrap();
    assert_eq!(
        scene.test.received(scene.at_car),
        vec![reflect(
            scene.car,
            vec![(POSITION, vec![5]), (WHEELS, vec![3])]
        )]
    );
}

#[test]
fn only_the_owner_may_update() {
    let scene = scene();
    let error = scene
        .test
        .list
        .update_attribute(
            scene.test.handle,
            scene.at_car,
            scene.car,
            vec![(POSITION, vec![1])],
            0.0,
            "",
        )
        .unwrap_err();
    assert_eq!(error.name(), "AttributeNotOwned");
    assert!(scene.test.sink.is_empty());
}

#[test]
fn interactions_climb_to_the_root_class() {
    let mut test = TestFederation::new();
    let sender = test.join("sender");
    let exact = test.join("exact");
    let general = test.join("general");
    test.list
        .subscribe_interaction(test.handle, exact, COLLISION, true)
        .unwrap();
    test.list
        .subscribe_interaction(test.handle, general, INTERACTION_ROOT, true)
        .unwrap();
    test.list
        .subscribe_interaction(test.handle, sender, COLLISION, true)
        .unwrap();

    let error = test
        .list
        .update_parameter(test.handle, sender, COLLISION, vec![(FORCE, vec![7])], 1.0, "bump")
        .unwrap_err();
    assert_eq!(error.name(), "InteractionClassNotPublished");

    test.list
        .publish_interaction(test.handle, sender, COLLISION, true)
        .unwrap();
    test.list
        .update_parameter(test.handle, sender, COLLISION, vec![(FORCE, vec![7])], 1.0, "bump")
        .unwrap();

    assert_eq!(
        test.received(exact),
        vec![NetworkMessage::ReceiveInteraction {
            class: COLLISION,
            parameters: vec![(FORCE, vec![7])],
            time: 1.0,
            tag: "bump".to_string()
        }]
    );
    assert_eq!(
        test.received(general),
        vec![NetworkMessage::ReceiveInteraction {
            class: INTERACTION_ROOT,
            parameters: Vec::new(),
            time: 1.0,
            tag: "bump".to_string()
        }]
    );
    assert!(test.received(sender).is_empty());
}
