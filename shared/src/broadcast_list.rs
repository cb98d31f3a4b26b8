use std::collections::BTreeSet;

use log::trace;

use crate::{
    messages::{network_message::NetworkMessage, outbox::Outbox},
    types::FederateHandle,
};

/// Which side of a declaration a broadcast is addressed to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    Subscribers,
    Publishers,
}

/// One class of a hierarchy, seen as a step of a broadcast walk
pub trait BroadcastLevel {
    type Class: Copy + Ord + std::fmt::Display;
    /// Attribute or parameter handle
    type Member: Copy + Ord;

    fn class_handle(&self) -> Self::Class;

    fn parent(&self) -> Option<Self::Class>;

    /// Federates declared on this class for `audience`, each with the members
    /// it declared
    fn audience(&self, audience: Audience) -> Vec<(FederateHandle, BTreeSet<Self::Member>)>;

    /// Adapts `message` to a recipient queued at `class` that is interested
    /// in `members`
    fn retarget(
        message: &NetworkMessage,
        class: Self::Class,
        members: &BTreeSet<Self::Member>,
    ) -> NetworkMessage;
}

#[derive(Clone, Debug)]
struct Recipient<C, M> {
    federate: FederateHandle,
    class: C,
    members: BTreeSet<M>,
}

/// Accumulates who must hear about one event while it is threaded from the
/// most-derived class up through its ancestors. Each federate is queued once,
/// tagged with the first (most-derived) class where it showed interest; later
/// levels only widen the members it receives.
pub struct BroadcastList<L: BroadcastLevel> {
    message: NetworkMessage,
    sender: FederateHandle,
    audience: Audience,
    members: Option<BTreeSet<L::Member>>,
    recipients: Vec<Recipient<L::Class, L::Member>>,
}

impl<L: BroadcastLevel> BroadcastList<L> {
    /// `members` restricts the event to some attributes (or parameters);
    /// `None` means any declaration on the class is enough, and each
    /// recipient gets whatever members it declared.
    pub fn new(
        message: NetworkMessage,
        sender: FederateHandle,
        audience: Audience,
        members: Option<BTreeSet<L::Member>>,
    ) -> Self {
        Self {
            message,
            sender,
            audience,
            members,
            recipients: Vec::new(),
        }
    }

    fn wanted(&self, interest: &BTreeSet<L::Member>) -> BTreeSet<L::Member> {
        match &self.members {
            Some(members) => interest.intersection(members).copied().collect(),
            None => interest.clone(),
        }
    }

    /// This level's contribution: federates declared here that are not the
    /// sender and are interested in the event.
    pub fn extend(mut self, level: &L) -> Self {
        for (federate, interest) in level.audience(self.audience) {
            if federate == self.sender {
                continue;
            }
            let wanted = self.wanted(&interest);
            if self.members.is_some() && wanted.is_empty() {
                continue;
            }
            match self
                .recipients
                .iter_mut()
                .find(|recipient| recipient.federate == federate)
            {
                Some(recipient) => recipient.members.extend(wanted),
                None => self.recipients.push(Recipient {
                    federate,
                    class: level.class_handle(),
                    members: wanted,
                }),
            }
        }
        self
    }

    /// Whether `extend(level)` would queue a new federate or widen an
    /// existing one
    pub fn would_extend(&self, level: &L) -> bool {
        level
            .audience(self.audience)
            .into_iter()
            .filter(|(federate, _)| *federate != self.sender)
            .any(|(federate, interest)| {
                let wanted = self.wanted(&interest);
                match self.recipients.iter().find(|r| r.federate == federate) {
                    Some(recipient) => !wanted.is_subset(&recipient.members),
                    None => self.members.is_none() || !wanted.is_empty(),
                }
            })
    }

    /// Threads the list through `ancestors` (nearest first). Stops as soon as
    /// no remaining ancestor would add anything.
    pub fn thread_upward(mut self, ancestors: &[&L]) -> Self {
        for (depth, level) in ancestors.iter().enumerate() {
            if !ancestors[depth..].iter().any(|rest| self.would_extend(rest)) {
                trace!(
                    "{} walk stops below class {}",
                    self.message.name(),
                    level.class_handle()
                );
                break;
            }
            self = self.extend(level);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn recipients(&self) -> impl Iterator<Item = FederateHandle> + '_ {
        self.recipients.iter().map(|recipient| recipient.federate)
    }

    /// Moves one adapted message per recipient into `outbox`
    pub fn flush(self, outbox: &mut Outbox) {
        for recipient in &self.recipients {
            outbox.push(
                recipient.federate,
                L::retarget(&self.message, recipient.class, &recipient.members),
            );
        }
    }
}
