//! Worker-id derivation from a CIDR-masked pod IP.
//!
//! The 24 low bits of a generated id are split into a worker-id field and a
//! sequence field. The CIDR's host mask determines how many workers are
//! addressable (`2^workerBits`); the remaining bits of the 24-bit field
//! become the sequence counter. `sequenceBits` must fall in
//! `[8, 16]`, i.e. `workerBits` must too.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use crate::error::{Error, Result};

/// The id field total width reserved for worker-id + sequence.
const WORKER_SEQUENCE_BITS: u32 = 24;

/// A resolved worker identity: the worker's numeric id and how many
/// sequence bits remain for the per-millisecond counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerId {
    /// The worker's numeric id, in `[0, 2^worker_bits)`.
    pub id: u64,
    /// Bits of the 24-bit field allocated to the per-millisecond sequence.
    pub sequence_bits: u8,
}

/// Derive a [`WorkerId`] from a pod IP and the CIDR describing the worker
/// pool's address range.
///
/// `host_bits = 32 - cidr.prefix_len()` gives the number of addressable
/// hosts under the CIDR; `worker_bits = host_bits` (one worker per host
/// address) and `sequence_bits = 24 - worker_bits`. The worker id itself is
/// the pod IP's low `worker_bits` bits (the host portion under the CIDR
/// mask).
pub fn derive_worker_id(cidr: Ipv4Net, pod_ip: Ipv4Addr) -> Result<WorkerId> {
    if !cidr.contains(&pod_ip) {
        return Err(Error::WorkerBitRange(format!(
            "pod ip {pod_ip} is not contained in cidr {cidr}"
        )));
    }

    let worker_bits = 32 - cidr.prefix_len() as u32;
    if worker_bits > WORKER_SEQUENCE_BITS {
        return Err(Error::WorkerBitRange(format!(
            "cidr {cidr} allows {worker_bits} host bits, exceeding the 24-bit worker/sequence field"
        )));
    }
    let sequence_bits = WORKER_SEQUENCE_BITS - worker_bits;
    if !(8..=16).contains(&sequence_bits) {
        return Err(Error::WorkerBitRange(format!(
            "sequenceBits {sequence_bits} out of required range [8, 16] (cidr {cidr} implies {worker_bits} worker bits)"
        )));
    }

    let host_mask: u32 = if worker_bits == 32 {
        u32::MAX
    } else {
        (1u32 << worker_bits) - 1
    };
    let pod_bits = u32::from(pod_ip);
    let id = (pod_bits & host_mask) as u64;

    Ok(WorkerId {
        id,
        sequence_bits: sequence_bits as u8,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_worker_id_from_low_host_bits() {
        let cidr: Ipv4Net = "10.0.0.0/16".parse().unwrap(); // 16 host bits -> 8 sequence bits
        let ip: Ipv4Addr = "10.0.1.44".parse().unwrap();
        let w = derive_worker_id(cidr, ip).unwrap();
        assert_eq!(w.sequence_bits, 8);
        assert_eq!(w.id, (1u64 << 8) | 44);
    }

    #[test]
    fn rejects_cidr_outside_sequence_bit_range() {
        // /8 -> 24 host bits -> 0 sequence bits, invalid.
        let cidr: Ipv4Net = "10.0.0.0/8".parse().unwrap();
        let ip: Ipv4Addr = "10.0.0.5".parse().unwrap();
        assert!(derive_worker_id(cidr, ip).is_err());
    }

    #[test]
    fn rejects_ip_outside_cidr() {
        let cidr: Ipv4Net = "10.0.0.0/24".parse().unwrap();
        let ip: Ipv4Addr = "192.168.1.1".parse().unwrap();
        assert!(derive_worker_id(cidr, ip).is_err());
    }

    #[test]
    fn boundary_prefix_lengths_are_accepted() {
        // /16 -> 16 worker bits -> 8 sequence bits (lower bound)
        let cidr: Ipv4Net = "172.16.0.0/16".parse().unwrap();
        let ip: Ipv4Addr = "172.16.255.255".parse().unwrap();
        assert!(derive_worker_id(cidr, ip).is_ok());

        // /24 -> 8 worker bits -> 16 sequence bits (upper bound)
        let cidr: Ipv4Net = "172.16.5.0/24".parse().unwrap();
        let ip: Ipv4Addr = "172.16.5.7".parse().unwrap();
        assert!(derive_worker_id(cidr, ip).is_ok());
    }
}
