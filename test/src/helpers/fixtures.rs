use rti_shared::{
    AttributeHandle, InteractionClassHandle, ObjectClassHandle, ObjectModel, ParameterHandle,
};

pub const OBJECT_ROOT: ObjectClassHandle = ObjectClassHandle::new(1);
pub const VEHICLE: ObjectClassHandle = ObjectClassHandle::new(2);
pub const CAR: ObjectClassHandle = ObjectClassHandle::new(3);
pub const SHIP: ObjectClassHandle = ObjectClassHandle::new(4);

pub const PRIVILEGE_TO_DELETE: AttributeHandle = AttributeHandle::new(1);
pub const POSITION: AttributeHandle = AttributeHandle::new(2);
/// Defined on `CAR`
pub const WHEELS: AttributeHandle = AttributeHandle::new(3);
/// Defined on `SHIP`
pub const DRAFT: AttributeHandle = AttributeHandle::new(3);

pub const INTERACTION_ROOT: InteractionClassHandle = InteractionClassHandle::new(1);
pub const COLLISION: InteractionClassHandle = InteractionClassHandle::new(2);
pub const FORCE: ParameterHandle = ParameterHandle::new(1);

/// ObjectRoot(privilegeToDelete) > Vehicle(position) > { Car(wheels), Ship(draft) },
/// InteractionRoot > Collision(force)
pub fn vehicle_model() -> ObjectModel {
    ObjectModel::builder()
        .object_class("ObjectRoot", None, &["privilegeToDelete"])
        .object_class("Vehicle", Some("ObjectRoot"), &["position"])
        .object_class("Car", Some("Vehicle"), &["wheels"])
        .object_class("Ship", Some("Vehicle"), &["draft"])
        .interaction_class("InteractionRoot", None, &[])
        .interaction_class("Collision", Some("InteractionRoot"), &["force"])
        .build()
        .expect("the vehicle model is well formed")
}
