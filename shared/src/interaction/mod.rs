pub mod interaction_class;
pub mod interaction_class_set;

use crate::broadcast_list::BroadcastList;

pub type InteractionBroadcastList = BroadcastList<interaction_class::InteractionClass>;
