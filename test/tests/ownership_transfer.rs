//! Attribute ownership moving between federates: divestiture, acquisition
//! and their cancellation.

use rti_shared::{AttributeHandle, FederateHandle, NetworkMessage, ObjectHandle, RtiError};
use rti_test::{TestFederation, CAR, POSITION, PRIVILEGE_TO_DELETE, WHEELS};

struct Scene {
    test: TestFederation,
    owner: FederateHandle,
    taker: FederateHandle,
    car: ObjectHandle,
}

impl Scene {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut test = TestFederation::new();
        let owner = test.join("owner");
        let taker = test.join("taker");
        test.list
            .publish_object(test.handle, owner, CAR, &[POSITION, WHEELS], true)
            .unwrap();
        test.list
            .publish_object(test.handle, taker, CAR, &[POSITION], true)
            .unwrap();
        let (car, _) = test.list.register_object(test.handle, owner, CAR, None).unwrap();
        test.sink.clear();
        Self {
            test,
            owner,
            taker,
            car,
        }
    }

    fn owns(&self, federate: FederateHandle, attribute: AttributeHandle) -> bool {
        self.test
            .list
            .is_owner(self.test.handle, federate, self.car, attribute)
            .unwrap()
    }
}

#[test]
fn registrant_owns_what_it_publishes() {
    let scene = Scene::new();
    assert!(scene.owns(scene.owner, POSITION));
    assert!(scene.owns(scene.owner, WHEELS));
    assert!(!scene.owns(scene.owner, PRIVILEGE_TO_DELETE));
    assert!(!scene.owns(scene.taker, POSITION));
}

#[test]
fn cancelled_divestiture_keeps_the_owner() {
    let scene = Scene::new();
    let list = &scene.test.list;
    let handle = scene.test.handle;

    list.negotiate_divestiture(handle, scene.owner, scene.car, &[POSITION], "handover")
        .unwrap();
    assert_eq!(
        scene.test.received(scene.taker),
        vec![NetworkMessage::RequestAttributeOwnershipAssumption {
            object: scene.car,
            attributes: vec![POSITION],
            tag: "handover".to_string()
        }]
    );
    assert_eq!(
        list.negotiate_divestiture(handle, scene.owner, scene.car, &[POSITION], "again"),
        Err(RtiError::AttributeAlreadyBeingDivested {
            object: scene.car,
            attribute: POSITION
        })
    );

    list.cancel_divestiture(handle, scene.owner, scene.car, &[POSITION])
        .unwrap();
    assert!(scene.owns(scene.owner, POSITION));
    assert_eq!(
        list.cancel_divestiture(handle, scene.owner, scene.car, &[POSITION]),
        Err(RtiError::AttributeDivestitureWasNotRequested {
            object: scene.car,
            attribute: POSITION
        })
    );

    list.acquire_if_available(handle, scene.taker, scene.car, &[POSITION])
        .unwrap();
    assert_eq!(
        scene.test.received(scene.taker),
        vec![NetworkMessage::AttributeOwnershipUnavailable {
            object: scene.car,
            attributes: vec![POSITION]
        }]
    );
    assert!(scene.owns(scene.owner, POSITION));
}

#[test]
fn offered_attributes_are_taken_at_once() {
    let scene = Scene::new();
    let list = &scene.test.list;
    let handle = scene.test.handle;
    list.negotiate_divestiture(handle, scene.owner, scene.car, &[POSITION], "")
        .unwrap();
    scene.test.sink.clear();

    list.acquire(handle, scene.taker, scene.car, &[POSITION], "mine")
        .unwrap();
    assert_eq!(
        scene.test.received(scene.taker),
        vec![NetworkMessage::AttributeOwnershipAcquisitionNotification {
            object: scene.car,
            attributes: vec![POSITION]
        }]
    );
    assert_eq!(
        scene.test.received(scene.owner),
        vec![NetworkMessage::AttributeOwnershipDivestitureNotification {
            object: scene.car,
            attributes: vec![POSITION]
        }]
    );
    assert!(scene.owns(scene.taker, POSITION));
    assert!(scene.owns(scene.owner, WHEELS));
}

#[test]
fn owned_attributes_need_a_release() {
    let scene = Scene::new();
    let list = &scene.test.list;
    let handle = scene.test.handle;

    list.acquire(handle, scene.taker, scene.car, &[POSITION], "please")
        .unwrap();
    assert_eq!(
        scene.test.received(scene.owner),
        vec![NetworkMessage::RequestAttributeOwnershipRelease {
            object: scene.car,
            attributes: vec![POSITION],
            tag: "please".to_string()
        }]
    );
    assert_eq!(
        list.acquire(handle, scene.taker, scene.car, &[POSITION], "please"),
        Err(RtiError::AttributeAlreadyBeingAcquired {
            object: scene.car,
            attribute: POSITION
        })
    );
    assert!(scene.owns(scene.owner, POSITION));

    let released = list
        .respond_release(handle, scene.owner, scene.car, &[POSITION])
        .unwrap();
    assert_eq!(released, vec![POSITION]);
    assert_eq!(
        scene.test.received(scene.taker),
        vec![NetworkMessage::AttributeOwnershipAcquisitionNotification {
            object: scene.car,
            attributes: vec![POSITION]
        }]
    );
    assert!(scene.owns(scene.taker, POSITION));
    assert!(!scene.owns(scene.owner, POSITION));
}

#[test]
fn cancelled_acquisition_is_confirmed_and_forgotten() {
    let scene = Scene::new();
    let list = &scene.test.list;
    let handle = scene.test.handle;
    list.acquire(handle, scene.taker, scene.car, &[POSITION], "")
        .unwrap();
    scene.test.sink.clear();

    list.cancel_acquisition(handle, scene.taker, scene.car, &[POSITION])
        .unwrap();
    assert_eq!(
        scene.test.received(scene.taker),
        vec![
            NetworkMessage::ConfirmAttributeOwnershipAcquisitionCancellation {
                object: scene.car,
                attributes: vec![POSITION]
            }
        ]
    );
    assert_eq!(
        list.cancel_acquisition(handle, scene.taker, scene.car, &[POSITION]),
        Err(RtiError::AttributeAcquisitionWasNotRequested {
            object: scene.car,
            attribute: POSITION
        })
    );
    assert_eq!(
        list.respond_release(handle, scene.owner, scene.car, &[POSITION]),
        Err(RtiError::FederateWasNotAskedToReleaseAttribute {
            object: scene.car,
            attribute: POSITION,
            federate: scene.owner
        })
    );
    assert_eq!(
        list.cancel_acquisition(handle, scene.owner, scene.car, &[POSITION]),
        Err(RtiError::AttributeAlreadyOwned {
            object: scene.car,
            attribute: POSITION
        })
    );
}

#[test]
fn unconditional_divestiture_prefers_a_waiting_candidate() {
    let scene = Scene::new();
    let list = &scene.test.list;
    let handle = scene.test.handle;
    list.acquire(handle, scene.taker, scene.car, &[POSITION], "")
        .unwrap();
    scene.test.sink.clear();

    list.divest(handle, scene.owner, scene.car, &[POSITION, WHEELS])
        .unwrap();
    assert_eq!(
        scene.test.received(scene.taker),
        vec![NetworkMessage::AttributeOwnershipAcquisitionNotification {
            object: scene.car,
            attributes: vec![POSITION]
        }]
    );
    assert!(scene.owns(scene.taker, POSITION));
    assert!(!scene.owns(scene.owner, WHEELS));

    list.search_owner(handle, scene.owner, scene.car, WHEELS)
        .unwrap();
    list.search_owner(handle, scene.owner, scene.car, POSITION)
        .unwrap();
    assert_eq!(
        scene.test.received(scene.owner),
        vec![
            NetworkMessage::AttributeIsNotOwned {
                object: scene.car,
                attribute: WHEELS
            },
            NetworkMessage::InformAttributeOwnership {
                object: scene.car,
                attribute: POSITION,
                owner: scene.taker
            },
        ]
    );
}

#[test]
fn acquisition_preconditions() {
    let scene = Scene::new();
    let list = &scene.test.list;
    let handle = scene.test.handle;

    assert!(matches!(
        list.acquire(handle, scene.taker, scene.car, &[WHEELS], ""),
        Err(RtiError::AttributeNotPublished { .. })
    ));
    assert_eq!(
        list.acquire(handle, scene.owner, scene.car, &[POSITION], ""),
        Err(RtiError::FederateOwnsAttributes {
            federate: scene.owner
        })
    );
    assert!(matches!(
        list.divest(handle, scene.taker, scene.car, &[POSITION]),
        Err(RtiError::AttributeNotOwned { .. })
    ));
    assert!(matches!(
        list.acquire(handle, scene.taker, ObjectHandle::new(999), &[POSITION], ""),
        Err(RtiError::ObjectNotKnown { .. })
    ));
    assert!(scene.test.sink.is_empty());
}

#[test]
fn killed_owner_passes_attributes_to_the_next_requester() {
    let mut scene = Scene::new();
    let heir = scene.test.join("heir");
    let list = &scene.test.list;
    let handle = scene.test.handle;
    list.publish_object(handle, heir, CAR, &[POSITION], true)
        .unwrap();
    list.acquire(handle, scene.taker, scene.car, &[POSITION], "")
        .unwrap();
    list.respond_release(handle, scene.owner, scene.car, &[POSITION])
        .unwrap();
    list.acquire(handle, heir, scene.car, &[POSITION], "")
        .unwrap();
    scene.test.sink.clear();

    list.kill_federate(handle, scene.taker);
    assert_eq!(
        scene.test.received(heir),
        vec![NetworkMessage::AttributeOwnershipAcquisitionNotification {
            object: scene.car,
            attributes: vec![POSITION]
        }]
    );
    assert!(scene.owns(heir, POSITION));
    assert!(scene.owns(scene.owner, WHEELS));
    assert_eq!(
        list.acquire_if_available(handle, heir, scene.car, &[POSITION]),
        Err(RtiError::FederateOwnsAttributes { federate: heir })
    );
}
