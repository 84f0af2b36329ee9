//! Massif context: opens, extends, and rolls over a massif blob.

use massif_mmr::{arithmetic, Value};

use crate::append::Appender;
use crate::bloom::{self, BloomConfig};
use crate::error::{Error, Result};
use crate::header::{self, StartHeader};
use crate::layout::{self, MassifLayout};
use crate::peak_stack::PeakStack;
use crate::trie::{self, IndexFields};

/// Configuration shared by every massif in a log.
#[derive(Debug, Clone, Copy)]
pub struct MassifConfig {
    pub height: u8,
    pub bloom: BloomConfig,
}

impl Default for MassifConfig {
    fn default() -> Self {
        Self {
            height: 14,
            bloom: BloomConfig::default(),
        }
    }
}

/// An in-memory handle on one massif's buffer, mid-append.
///
/// Callers acquire a context from committed bytes (or create a fresh one), mutate it via
/// [`MassifContext::append_leaf`], and either commit the resulting
/// buffer through the storage layer or discard it.
pub struct MassifContext {
    config: MassifConfig,
    massif_index: u32,
    start: StartHeader,
    layout: MassifLayout,
    index_region: Vec<u8>,
    appender: Appender,
}

impl MassifContext {
    /// Construct the very first massif of a log (massif index 0).
    pub fn create_first(config: MassifConfig) -> Self {
        Self::create(config, 0, PeakStack::empty(), 0, 0)
    }

    fn create(
        config: MassifConfig,
        massif_index: u32,
        peak_stack: PeakStack,
        last_id_timestamp: u64,
        commitment_epoch: u32,
    ) -> Self {
        let layout = MassifLayout::new(config.height, config.bloom.bits_per_element, peak_stack.len() as u32);
        let mut index_region = vec![0u8; (layout.peak_stack_offset() - layout.index_header_offset()) as usize];
        bloom::init_header(&mut index_region[..32], config.bloom, config.height)
            .expect("massif configuration must be valid Bloom sizing");
        let start = StartHeader {
            last_id_timestamp,
            version: 1,
            commitment_epoch,
            massif_height: config.height,
            massif_index,
            secondary_index_root: Value::ZERO,
        };
        Self {
            config,
            massif_index,
            start,
            layout,
            index_region,
            appender: Appender::new(config.height, massif_index, peak_stack),
        }
    }

    /// Rebuild a context from a previously committed blob's bytes. Every
    /// sizing parameter is either carried in the start/Bloom headers or
    /// derivable in closed form from `massif_index`, so no side-channel
    /// configuration is required.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let start = header::decode_start(bytes)?;
        let h = start.massif_height;
        let bloom_header_start = layout::START_HEADER_LEN as usize;
        let bloom_hdr = bloom::BloomHeader::parse(
            &bytes[bloom_header_start..bloom_header_start + layout::BLOOM_HEADER_LEN as usize],
        )?;
        let bits_per_element = (bloom_hdr.m() as u64 / layout::leaf_capacity(h)) as u32;
        let config = MassifConfig {
            height: h,
            bloom: BloomConfig {
                bits_per_element,
                k: bloom_hdr.k(),
            },
        };

        let peak_stack_len = layout::peak_stack_len(start.massif_index);
        let layout = MassifLayout::new(h, bits_per_element, peak_stack_len);
        if bytes.len() < layout.log_offset() as usize {
            return Err(Error::MassifDataLengthInvalid(
                bytes.len(),
                layout.log_offset() as usize,
            ));
        }
        let index_region =
            bytes[layout.index_header_offset() as usize..layout.peak_stack_offset() as usize].to_vec();

        let peak_stack_bytes =
            &bytes[layout.peak_stack_offset() as usize..layout.log_offset() as usize];
        let peak_stack_entries = peak_stack_bytes
            .chunks_exact(32)
            .map(|c| Value::from_slice(c).ok_or(Error::BadRegionSize))
            .collect::<Result<Vec<_>>>()?;
        let peak_stack = PeakStack::new(peak_stack_entries);

        let node_count = layout.node_count(bytes.len())? as usize;
        let log_bytes = &bytes[layout.log_offset() as usize..];
        let stream = log_bytes[..node_count * 32]
            .chunks_exact(32)
            .map(|c| Value::from_slice(c).ok_or(Error::BadRegionSize))
            .collect::<Result<Vec<_>>>()?;

        let first_index = layout::massif_first_node_index(h, start.massif_index);
        let leaves_added = (0..node_count as u64)
            .filter(|&local| arithmetic::pos_height_in_tree(first_index + local) == 0)
            .count() as u64;

        Ok(Self {
            config,
            massif_index: start.massif_index,
            start,
            layout,
            index_region,
            appender: Appender::resume(h, start.massif_index, peak_stack, stream, leaves_added),
        })
    }

    pub fn massif_index(&self) -> u32 {
        self.massif_index
    }

    pub fn layout(&self) -> &MassifLayout {
        &self.layout
    }

    pub fn last_id_timestamp(&self) -> u64 {
        self.start.last_id_timestamp
    }

    pub fn is_complete(&self) -> bool {
        self.appender.is_complete()
    }

    fn bloom_range(&self) -> std::ops::Range<usize> {
        let base = self.layout.index_header_offset();
        0..(self.layout.side_trie_base_offset() - base) as usize
    }

    fn trie_base_range(&self) -> std::ops::Range<usize> {
        let base = self.layout.index_header_offset();
        (self.layout.side_trie_base_offset() - base) as usize
            ..(self.layout.side_trie_ext_offset() - base) as usize
    }

    fn trie_ext_range(&self) -> std::ops::Range<usize> {
        let base = self.layout.index_header_offset();
        (self.layout.side_trie_ext_offset() - base) as usize..self.index_region.len()
    }

    /// Append one leaf: insert it into all four Bloom filters, write its
    /// side-trie record, then run it through the MMR append engine.
    ///
    /// `id_timestamp` must be strictly greater than the last id persisted
    /// in this massif's start header, per the ordering guarantee in the
    /// concurrency model.
    pub fn append_leaf(
        &mut self,
        leaf: Value,
        id_timestamp: u64,
        fields: IndexFields,
    ) -> Result<u64> {
        if id_timestamp <= self.start.last_id_timestamp {
            return Err(Error::NonMonotonicIdTimestamp(
                id_timestamp,
                self.start.last_id_timestamp,
            ));
        }
        let leaf_local_index = self.appender.leaves_added();

        let bloom_range = self.bloom_range();
        for filter_idx in 0..4u8 {
            bloom::insert(&mut self.index_region[bloom_range.clone()], filter_idx, leaf.as_bytes())?;
        }

        let (base_range, ext_range) = (self.trie_base_range(), self.trie_ext_range());
        let fields = IndexFields {
            id_timestamp: Some(id_timestamp),
            ..fields
        };
        {
            let (base, ext) = self.index_region.split_at_mut(ext_range.start);
            trie::set_index_fields(
                &mut base[base_range],
                &mut ext[..ext_range.len()],
                leaf_local_index,
                &fields,
            )?;
        }

        let new_size = self.appender.append_leaf(leaf)?;
        self.start.last_id_timestamp = id_timestamp;
        if self.appender.is_complete() {
            self.start.secondary_index_root = self.compute_secondary_index_root();
        }
        Ok(new_size)
    }

    fn compute_secondary_index_root(&self) -> Value {
        massif_mmr::sha256(&self.index_region)
    }

    /// Serialize the current buffer to bytes, in blob order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.layout.complete_len_for(self.massif_index) as usize);
        out.resize(layout::START_HEADER_LEN as usize, 0);
        header::encode_start(&mut out, &self.start).expect("start header always fits");
        out.extend_from_slice(&self.index_region);
        for v in self.appender.peak_stack().as_slice() {
            out.extend_from_slice(v.as_bytes());
        }
        for v in self.appender.stream() {
            out.extend_from_slice(v.as_bytes());
        }
        out
    }

    /// Produce the initial buffer for the next massif (rollover).
    /// Only valid once `self.is_complete()`.
    pub fn rollover(&self) -> Result<Self> {
        if !self.is_complete() {
            return Err(Error::MassifFull);
        }
        let last_value = *self
            .appender
            .stream()
            .last()
            .ok_or(Error::BeforeFirstLeaf)?;
        let next_stack = self
            .appender
            .peak_stack()
            .rollover(self.massif_index, last_value);
        tracing::debug!(
            massif_index = self.massif_index,
            next_massif_index = self.massif_index + 1,
            peak_stack_len = next_stack.len(),
            "rolling over to next massif"
        );
        Ok(Self::create(
            self.config,
            self.massif_index + 1,
            next_stack,
            self.start.last_id_timestamp,
            self.start.commitment_epoch,
        ))
    }

    fn first_node_index(&self) -> u64 {
        layout::massif_first_node_index(self.config.height, self.massif_index)
    }

    /// The accumulator peaks that live entirely inside this massif's own
    /// log stream, at its current local size. Peaks inherited from older
    /// massifs (still unconsumed) are not included — for massif 0 this
    /// happens to equal the full accumulator, but for any `k > 0` with
    /// unconsumed ancestors it is a strict subset. Do not sign or compare
    /// this as an accumulator state; use [`Self::full_peaks`] for that.
    pub fn local_peaks(&self) -> Vec<Value> {
        let first_index = self.first_node_index();
        let global_size = first_index + self.appender.local_size();
        arithmetic::peak_positions(global_size)
            .into_iter()
            .filter(|&pos| pos >= first_index)
            .map(|pos| self.appender.stream()[(pos - first_index) as usize])
            .collect()
    }

    /// The inherited ancestor peaks this massif's peak stack holds,
    /// keyed by their global MMR position.
    pub fn ancestor_map(&self) -> std::collections::HashMap<u64, Value> {
        let first_index = self.first_node_index();
        let positions = arithmetic::peak_positions(first_index);
        positions
            .into_iter()
            .zip(self.appender.peak_stack().as_slice().iter().copied())
            .collect()
    }

    /// A [`crate::accumulator::NodeSource`] over this massif's own
    /// nodes plus whatever ancestor peaks it still holds — enough to
    /// derive the accumulator's peak list at any size within this
    /// massif's range.
    pub fn node_source(&self) -> OwnedNodeSource {
        OwnedNodeSource {
            ancestors: self.ancestor_map(),
            first_index: self.first_node_index(),
            local_stream: self.appender.stream().to_vec(),
        }
    }

    /// The global MMR size this massif currently represents
    /// (`first_index + local_size`).
    pub fn global_size(&self) -> u64 {
        self.first_node_index() + self.appender.local_size()
    }

    /// The full accumulator peak list at this massif's current global
    /// size — `PeakHashes(mmrSize - 1)`, ancestors included.
    ///
    /// This is what a checkpoint must sign over and what replication's
    /// consistency checks must compare: unlike [`Self::local_peaks`],
    /// which only reports peaks that live inside this massif's own log
    /// stream, any massif `k > 0` with unconsumed ancestors in its peak
    /// stack needs those resolved too, or the signed/compared peak set
    /// is short by exactly the peaks still sitting in the stack.
    pub fn full_peaks(&self) -> Result<Vec<Value>> {
        crate::accumulator::peaks_at(self.global_size(), &self.node_source())
    }
}

/// An owned [`crate::accumulator::NodeSource`] snapshotting one
/// [`MassifContext`]'s nodes and inherited ancestor peaks.
pub struct OwnedNodeSource {
    ancestors: std::collections::HashMap<u64, Value>,
    first_index: u64,
    local_stream: Vec<Value>,
}

impl crate::accumulator::NodeSource for OwnedNodeSource {
    fn node_at(&self, pos: u64) -> Result<Value> {
        crate::accumulator::CombinedSource {
            ancestors: &self.ancestors,
            first_index: self.first_index,
            local_stream: &self.local_stream,
        }
        .node_at(pos)
    }
}
