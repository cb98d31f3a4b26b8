//! Federates talking to a live coordinator over localhost TCP.

use std::{
    net::{Ipv4Addr, SocketAddr},
    thread::{self, JoinHandle},
    time::Duration,
};

use rti_server::{RtiServerError, Server, ServerConfig, ServerHandle, StatisticsConfig};
use rti_shared::NetworkMessage;
use rti_test::{vehicle_model, TestFederate, CAR, POSITION, VEHICLE};

const WAIT: Duration = Duration::from_secs(5);

fn start() -> (ServerHandle, JoinHandle<Result<(), RtiServerError>>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = ServerConfig {
        listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
        statistics: StatisticsConfig {
            display: false,
            ..StatisticsConfig::default()
        },
        ..ServerConfig::default()
    };
    let mut server = Server::new(config, vehicle_model());
    let address = server.listen().unwrap();
    assert_ne!(address.port(), 0);
    assert!(matches!(
        server.listen(),
        Err(RtiServerError::AlreadyListening { .. })
    ));
    let handle = server.handle().unwrap();
    let serving = thread::spawn(move || server.serve());
    (handle, serving)
}

fn exception_name(reply: NetworkMessage) -> String {
    match reply {
        NetworkMessage::Exception { name, .. } => name,
        other => panic!("expected an exception, got {:?}", other),
    }
}

#[test]
fn federates_exchange_objects_through_the_coordinator() {
    let (handle, serving) = start();

    let mut driver = TestFederate::connect(handle.address()).unwrap();
    let mut watcher = TestFederate::connect(handle.address()).unwrap();
    let (federation, driver_handle) = driver.join("exercise", "driver").unwrap();
    let (same, watcher_handle) = watcher.join("exercise", "watcher").unwrap();
    assert_eq!(federation, same);
    assert_ne!(driver_handle, watcher_handle);

    assert_eq!(
        driver
            .request(NetworkMessage::PublishObjectClass {
                class: CAR,
                attributes: vec![POSITION],
            })
            .unwrap(),
        NetworkMessage::Acknowledge
    );
    let object = match driver
        .request(NetworkMessage::RegisterObject {
            class: CAR,
            name: Some("beetle".to_string()),
        })
        .unwrap()
    {
        NetworkMessage::ObjectRegistered { object, name } => {
            assert_eq!(name, "beetle");
            object
        }
        other => panic!("unexpected reply {:?}", other),
    };

    assert_eq!(
        watcher
            .request(NetworkMessage::SubscribeObjectClassAttributes {
                class: VEHICLE,
                attributes: vec![POSITION],
            })
            .unwrap(),
        NetworkMessage::Acknowledge
    );
    assert_eq!(
        watcher.next_notification(WAIT).unwrap(),
        Some(NetworkMessage::DiscoverObject {
            object,
            class: VEHICLE,
            name: "beetle".to_string(),
        })
    );

    assert_eq!(
        driver
            .request(NetworkMessage::UpdateAttributeValues {
                object,
                values: vec![(POSITION, vec![1, 2, 3])],
                time: 0.0,
                tag: "move".to_string(),
            })
            .unwrap(),
        NetworkMessage::Acknowledge
    );
    assert_eq!(
        watcher.next_notification(WAIT).unwrap(),
        Some(NetworkMessage::ReflectAttributeValues {
            object,
            values: vec![(POSITION, vec![1, 2, 3])],
            time: 0.0,
            tag: "move".to_string(),
        })
    );

    let reply = watcher
        .request(NetworkMessage::DestroyFederationExecution {
            federation_name: "exercise".to_string(),
        })
        .unwrap();
    assert_eq!(exception_name(reply), "FederatesCurrentlyJoined");

    // a crashed federate loses its objects
    driver.abort();
    assert_eq!(
        watcher.next_notification(WAIT).unwrap(),
        Some(NetworkMessage::RemoveObject {
            object,
            tag: String::new(),
        })
    );

    assert_eq!(
        watcher
            .request(NetworkMessage::ResignFederationExecution)
            .unwrap(),
        NetworkMessage::Acknowledge
    );
    assert_eq!(
        watcher
            .request(NetworkMessage::DestroyFederationExecution {
                federation_name: "exercise".to_string(),
            })
            .unwrap(),
        NetworkMessage::Acknowledge
    );
    watcher.close().unwrap();

    handle.stop();
    serving.join().unwrap().unwrap();
}

#[test]
fn failures_are_reported_as_exceptions() {
    let (handle, serving) = start();
    let mut federate = TestFederate::connect(handle.address()).unwrap();

    let reply = federate
        .request(NetworkMessage::PublishObjectClass {
            class: CAR,
            attributes: vec![POSITION],
        })
        .unwrap();
    assert_eq!(exception_name(reply), "RTIinternalError");

    let reply = federate
        .request(NetworkMessage::JoinFederationExecution {
            federation_name: "missing".to_string(),
            federate_name: "lost".to_string(),
        })
        .unwrap();
    assert_eq!(exception_name(reply), "FederationExecutionDoesNotExist");

    federate.join("exercise", "pilot").unwrap();
    let reply = federate
        .request(NetworkMessage::RegisterObject {
            class: CAR,
            name: None,
        })
        .unwrap();
    assert_eq!(exception_name(reply), "ObjectClassNotPublished");

    match federate
        .request(NetworkMessage::RequestIdPool { count: 10 })
        .unwrap()
    {
        NetworkMessage::IdPoolGranted { first, last } => {
            assert_eq!(last.value() - first.value(), 9);
        }
        other => panic!("unexpected reply {:?}", other),
    }
    federate.close().unwrap();

    handle.stop();
    serving.join().unwrap().unwrap();
}
