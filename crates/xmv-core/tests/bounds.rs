use xmv_core::{fill_pattern, DeviceStatus, Packet, Region, XmvError, PACKET_SIZE};

#[test]
fn contains_is_half_open() {
    let region = Region::new(0x1800_0000, 0x0010_0000);

    assert!(region.contains(0x1800_0000)); // base inclusive
    assert!(region.contains(0x1800_0000 + 0x0010_0000 - 1)); // last byte
    assert!(!region.contains(0x1800_0000 + 0x0010_0000)); // end exclusive
    assert!(!region.contains(0x1800_0000 - 1)); // below base
    assert!(!region.contains(0x1800_0000 - 4));
    assert!(!region.contains(0));
}

#[test]
fn contains_near_address_space_top() {
    // base + size reaching the top of u32 must not wrap.
    let region = Region::new(0xFFFF_F000, 0x1000);
    assert!(region.contains(0xFFFF_FFFF));
    assert!(!region.contains(0xFFFF_EFFF));
}

#[test]
fn pattern_is_index_mod_256() {
    let mut buf = [0u8; 300];
    fill_pattern(&mut buf);
    for (i, b) in buf.iter().enumerate() {
        assert_eq!(*b as usize, i % 256);
    }

    let mut pkt = Packet::default();
    assert_eq!(pkt.data, [0u8; PACKET_SIZE]);
    pkt.fill_pattern();
    for i in 0..PACKET_SIZE {
        assert_eq!(pkt.data[i], i as u8);
    }
}

#[test]
fn status_code_plumbing() {
    assert_eq!(DeviceStatus::from_code(0), DeviceStatus::Success);
    assert_eq!(DeviceStatus::from_code(0x05), DeviceStatus::Failure(0x05));
    assert!(DeviceStatus::Success.is_success());
    assert!(!DeviceStatus::Failure(1).is_success());
    assert_eq!(DeviceStatus::Failure(0xDEAD_BEEF).code(), 0xDEAD_BEEF);
}

#[test]
fn fault_labels_are_distinguishable() {
    let faults = [
        XmvError::EraseFailed(5),
        XmvError::ReadFailed(5),
        XmvError::WriteFailed(5),
        XmvError::DataMismatch,
        XmvError::ModeTransitionFailed(5),
        XmvError::ReferenceOutOfRange(0x1000),
    ];
    for (i, a) in faults.iter().enumerate() {
        for b in faults.iter().skip(i + 1) {
            assert_ne!(a.label(), b.label());
        }
    }
    assert_eq!(XmvError::EraseFailed(0x05).code(), 0x05);
    assert_eq!(XmvError::DataMismatch.code(), 0);
}
