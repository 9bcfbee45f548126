use bytes::Bytes;
use kvscan::{
    Client, CommandError, CursorState, HashScan, InMemoryStore, KeyValue, KvResult, RangeQuery,
    ScanArgs, ScanWalk, StatusCode, Transport,
};
use kvscan_error::{bail, GenericError};

fn five_fields() -> anyhow::Result<Client<InMemoryStore>> {
    let mut client = Client::new(InMemoryStore::new());
    let pairs: Vec<(Bytes, Bytes)> = (0..5)
        .map(|i| (Bytes::from(format!("f{i}")), Bytes::from(format!("v{i}"))))
        .collect();
    client.hmset("h", &pairs)?;
    Ok(client)
}

/// Channel that refuses the element at `fail_at`.
struct Refusing {
    fail_at: usize,
    accepted: Vec<KeyValue>,
}

impl kvscan::StreamingChannel<KeyValue> for Refusing {
    fn accept(
        &mut self,
        element: KeyValue,
    ) -> KvResult<()> {
        if self.accepted.len() == self.fail_at {
            return Err(GenericError::new(StatusCode::Internal, "downstream closed").into());
        }
        self.accepted.push(element);
        Ok(())
    }
}

fn fault_position(err: &kvscan::StackError) -> Option<u64> {
    match err.downcast_ref::<CommandError>() {
        Some(CommandError::ChannelFault { position, .. }) => Some(*position),
        _ => None,
    }
}

/// Fault on the third of five elements: two were delivered, the other two
/// never reach the channel and the step fails with the fault position.
#[test]
fn test_fault_mid_page_abandons_rest() -> anyhow::Result<()> {
    let mut client = five_fields()?;
    let mut channel = Refusing {
        fail_at: 2,
        accepted: Vec::new(),
    };

    let err = client.hscan_stream(&mut channel, "h", None, None).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::ChannelFault);
    assert_eq!(fault_position(&err), Some(2));
    assert!(err.to_string().contains("downstream closed"));
    assert_eq!(
        channel.accepted,
        vec![KeyValue::new("f0", "v0"), KeyValue::new("f1", "v1")]
    );
    Ok(())
}

/// A faulted step does not move the walk, so the same step can be issued
/// again with a working channel.
#[test]
fn test_walk_state_kept_after_fault() -> anyhow::Result<()> {
    let client = five_fields()?;
    let mut store = client.into_transport();
    let mut walk = ScanWalk::<HashScan>::new("h", Some(ScanArgs::new().limit(3)));

    let command = walk.next_command()?.expect("first step");
    let reply = store.execute(&command)?;
    let mut refusing = Refusing {
        fail_at: 0,
        accepted: Vec::new(),
    };
    let err = walk.advance_streaming(reply, &mut refusing).unwrap_err();
    assert_eq!(fault_position(&err), Some(0));
    assert_eq!(walk.state(), &CursorState::Initial);
    assert_eq!(walk.steps(), 0);

    let mut all = Vec::new();
    while let Some(command) = walk.next_command()? {
        let reply = store.execute(&command)?;
        walk.advance_streaming(reply, &mut |kv: KeyValue| -> KvResult<()> {
            all.push(kv);
            Ok(())
        })?;
    }
    assert_eq!(all.len(), 5);
    assert_eq!(walk.steps(), 2);
    Ok(())
}

#[test]
fn test_full_walk_stops_at_first_fault() -> anyhow::Result<()> {
    let mut client = five_fields()?;
    let mut seen = 0;
    let err = client
        .scan_all_stream::<HashScan, _>(
            &mut |_: KeyValue| -> KvResult<()> {
                seen += 1;
                if seen == 4 {
                    bail!(StatusCode::Internal, "stop");
                }
                Ok(())
            },
            "h",
            Some(&ScanArgs::new().limit(2)),
        )
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::ChannelFault);
    // Fourth element overall is the second of the second page.
    assert_eq!(fault_position(&err), Some(1));
    assert_eq!(seen, 4);
    Ok(())
}

#[test]
fn test_range_stream_fault() -> anyhow::Result<()> {
    let mut client = Client::new(InMemoryStore::new());
    let entries: Vec<(f64, Bytes)> = (0..5)
        .map(|i| (f64::from(i), Bytes::from(format!("m{i}"))))
        .collect();
    client.zadd_multi("z", &entries)?;

    let mut got = Vec::new();
    let err = client
        .zrange_stream(
            &mut |m: Bytes| -> KvResult<()> {
                if got.len() == 2 {
                    bail!(StatusCode::Internal, "full");
                }
                got.push(m);
                Ok(())
            },
            "z",
            &RangeQuery::by_rank(0, -1),
        )
        .unwrap_err();
    assert_eq!(fault_position(&err), Some(2));
    assert_eq!(got, vec![Bytes::from("m0"), Bytes::from("m1")]);

    // The client is still usable afterwards.
    assert_eq!(client.zcard("z")?, 5);
    Ok(())
}
