use crate::{RingBuffer, StreamError};
use proptest::prelude::*;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Op {
    Write(Vec<u8>),
    Read(usize),
    Clear,
}

const MAX_CAPACITY: usize = 4096;
const MAX_OPS: usize = 64;
const MAX_RW_LEN: usize = 1024;

fn capacity_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![Just(1usize), Just(7usize), Just(64usize), 1usize..=MAX_CAPACITY]
}

fn op_strategy() -> BoxedStrategy<Op> {
    prop_oneof![
        5 => prop::collection::vec(any::<u8>(), 0..=MAX_RW_LEN).prop_map(Op::Write),
        4 => (0usize..=MAX_RW_LEN).prop_map(Op::Read),
        1 => Just(Op::Clear),
    ]
    .boxed()
}

fn scenario_strategy() -> BoxedStrategy<(usize, Vec<Op>)> {
    (
        capacity_strategy(),
        prop::collection::vec(op_strategy(), 1..=MAX_OPS),
    )
        .boxed()
}

proptest! {
    /// Any sequence of write/read/clear operations keeps the occupancy
    /// accounting exact and dequeues bytes in FIFO order. Rejected
    /// operations must leave the buffer untouched.
    #[test]
    fn ring_matches_fifo_model((capacity, ops) in scenario_strategy()) {
        let mut ring = RingBuffer::new(capacity);
        let mut model: VecDeque<u8> = VecDeque::new();

        for op in ops {
            match op {
                Op::Write(data) => {
                    let fits = data.len() <= capacity - model.len();
                    match ring.write(&data) {
                        Ok(()) => {
                            prop_assert!(fits);
                            model.extend(data.iter().copied());
                        }
                        Err(StreamError::Overflow { requested, free }) => {
                            prop_assert!(!fits);
                            prop_assert_eq!(requested, data.len());
                            prop_assert_eq!(free, capacity - model.len());
                        }
                        Err(other) => prop_assert!(false, "unexpected error: {}", other),
                    }
                }
                Op::Read(len) => {
                    let mut out = vec![0u8; len];
                    let enough = len <= model.len();
                    match ring.read(&mut out) {
                        Ok(()) => {
                            prop_assert!(enough);
                            let expected: Vec<u8> = model.drain(..len).collect();
                            prop_assert_eq!(out, expected);
                        }
                        Err(StreamError::Underrun { requested, occupied }) => {
                            prop_assert!(!enough);
                            prop_assert_eq!(requested, len);
                            prop_assert_eq!(occupied, model.len());
                        }
                        Err(other) => prop_assert!(false, "unexpected error: {}", other),
                    }
                }
                Op::Clear => {
                    ring.clear();
                    model.clear();
                }
            }

            prop_assert_eq!(ring.occupied(), model.len());
            prop_assert_eq!(ring.occupied() + ring.free_space(), ring.capacity());
        }
    }
}
