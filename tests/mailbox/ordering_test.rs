/*!
 * Mailbox Ordering Properties
 * Property-based checks of arrival order and selective receive
 */

use lwp_kernel::mailbox::{Envelope, Mailbox, MailboxError, Receive};
use lwp_kernel::{Pid, SchemaId, Term};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// (sender, tag) pairs; payload is the arrival index
fn fill(messages: &[(u64, u32)]) -> Mailbox {
    let mut mailbox = Mailbox::new(Pid(1));
    for (i, (sender, tag)) in messages.iter().enumerate() {
        mailbox
            .enqueue(Envelope::tagged(
                Some(Pid(100 + sender)),
                SchemaId(*tag),
                Term::Int(i as i64),
            ))
            .unwrap();
    }
    mailbox
}

fn drain_indices(mailbox: &mut Mailbox) -> Vec<i64> {
    let mut order = Vec::new();
    while let Ok(envelope) = mailbox.receive(&Receive::any()) {
        order.push(envelope.view().payload().as_int().unwrap());
    }
    order
}

fn messages() -> impl Strategy<Value = Vec<(u64, u32)>> {
    prop::collection::vec((0u64..3, 1u32..5), 0..64)
}

proptest! {
    #[test]
    fn prop_plain_receive_is_arrival_order(messages in messages()) {
        let mut mailbox = fill(&messages);
        let order = drain_indices(&mut mailbox);
        prop_assert_eq!(order, (0..messages.len() as i64).collect::<Vec<_>>());
    }

    #[test]
    fn prop_selective_receive_takes_first_match_only(
        messages in messages(),
        wanted in 1u32..5,
    ) {
        let mut mailbox = fill(&messages);
        let first = messages.iter().position(|(_, tag)| *tag == wanted);

        match mailbox.receive(&Receive::tag(SchemaId(wanted))) {
            Ok(envelope) => {
                let index = envelope.view().payload().as_int().unwrap();
                prop_assert_eq!(Some(index as usize), first);
            }
            Err(e) => {
                prop_assert_eq!(e, MailboxError::WouldBlock);
                prop_assert_eq!(first, None);
            }
        }

        let expected: Vec<i64> = (0..messages.len())
            .filter(|i| Some(*i) != first)
            .map(|i| i as i64)
            .collect();
        prop_assert_eq!(drain_indices(&mut mailbox), expected);
    }

    #[test]
    fn prop_each_sender_keeps_its_order(messages in messages(), wanted in 1u32..5) {
        let mut mailbox = fill(&messages);

        // Drain one tag class first, then the rest
        let mut order = Vec::new();
        while let Ok(envelope) = mailbox.receive(&Receive::tag(SchemaId(wanted))) {
            order.push(envelope.view().payload().as_int().unwrap());
        }
        order.extend(drain_indices(&mut mailbox));

        for sender in 0..3u64 {
            for tag_class in [true, false] {
                let seen: Vec<i64> = order
                    .iter()
                    .copied()
                    .filter(|i| {
                        let (s, t) = messages[*i as usize];
                        s == sender && (t == wanted) == tag_class
                    })
                    .collect();
                let mut sorted = seen.clone();
                sorted.sort_unstable();
                prop_assert_eq!(seen, sorted);
            }
        }
    }
}

#[test]
fn test_bounded_mailbox_rejects_only_user_messages() {
    use lwp_kernel::{ExitReason, MessageKind};

    let mut mailbox = Mailbox::with_capacity(Pid(1), Some(2));
    for i in 0..2 {
        mailbox
            .enqueue(Envelope::tagged(None, SchemaId(1), Term::Int(i)))
            .unwrap();
    }
    assert_eq!(
        mailbox
            .enqueue(Envelope::tagged(None, SchemaId(1), Term::Int(2)))
            .unwrap_err(),
        MailboxError::Full { capacity: 2 }
    );

    mailbox
        .enqueue(Envelope::system(MessageKind::Exit {
            from: Pid(9),
            reason: ExitReason::Normal,
        }))
        .unwrap();
    assert_eq!(mailbox.len(), 3);
}
