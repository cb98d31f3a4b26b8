pub mod object_class;
pub mod object_class_set;
pub mod object_instance;

use crate::broadcast_list::BroadcastList;

pub type ObjectClassBroadcastList = BroadcastList<object_class::ObjectClass>;
