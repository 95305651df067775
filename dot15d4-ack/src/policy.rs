//! Per-source acknowledgment content: the frame pending bit and header IEs.
use dot15d4_frame::{ie::validate_header_ies, Address, MpduParser, MpduWithAllFields};
use heapless::Vec;

/// Decides on the acknowledgment content that depends on the acknowledged
/// frame's originator.
pub trait AckPolicy {
    /// Whether the frame pending bit of the acknowledgment should be set.
    fn pending_bit_should_be_set(&self, frame: &MpduParser<&[u8], MpduWithAllFields>) -> bool;

    /// Header IEs to attach to the acknowledgment of a frame from the given
    /// source address, if any.
    ///
    /// The returned bytes must form a well-formed list of header IEs without
    /// termination.
    fn header_ie_for(&self, src_address: &Address<&[u8]>) -> Option<&[u8]>;
}

/// Acknowledges without pending bit and header IEs.
impl AckPolicy for () {
    fn pending_bit_should_be_set(&self, _: &MpduParser<&[u8], MpduWithAllFields>) -> bool {
        false
    }

    fn header_ie_for(&self, _: &Address<&[u8]>) -> Option<&[u8]> {
        None
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AckDataError {
    /// No more addresses can be stored.
    TableFull,
    /// The IE data does not fit into an entry.
    IeDataTooLong,
    /// The IE data is not a well-formed list of header IEs.
    MalformedIeData,
    /// Entries require a short or extended address.
    AbsentAddress,
}

impl core::fmt::Display for AckDataError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AckDataError::TableFull => write!(f, "ack data table full"),
            AckDataError::IeDataTooLong => write!(f, "IE data too long"),
            AckDataError::MalformedIeData => write!(f, "malformed IE data"),
            AckDataError::AbsentAddress => write!(f, "absent address"),
        }
    }
}

/// How source addresses in the table influence the frame pending bit.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SourceMatch {
    /// The pending bit is set for sources marked pending and for frames
    /// without source address (Thread).
    Thread,
    /// The pending bit is set for all sources but those marked pending
    /// (Zigbee).
    Blacklist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AckDataEntry<const IE_LEN: usize> {
    /// Little-endian short or extended address.
    address: Vec<u8, 8>,
    pending: bool,
    ie_data: Vec<u8, IE_LEN>,
}

impl<const IE_LEN: usize> AckDataEntry<IE_LEN> {
    fn is_unused(&self) -> bool {
        !self.pending && self.ie_data.is_empty()
    }
}

/// A fixed capacity table of pending bits and header IE data keyed by short
/// or extended source address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckDataTable<const N: usize, const IE_LEN: usize> {
    entries: Vec<AckDataEntry<IE_LEN>, N>,
    source_match: SourceMatch,
    pending_bit_enabled: bool,
}

impl<const N: usize, const IE_LEN: usize> AckDataTable<N, IE_LEN> {
    pub const fn new(source_match: SourceMatch) -> Self {
        Self {
            entries: Vec::new(),
            source_match,
            pending_bit_enabled: true,
        }
    }

    pub fn source_match(&self) -> SourceMatch {
        self.source_match
    }

    pub fn set_source_match(&mut self, source_match: SourceMatch) {
        self.source_match = source_match;
    }

    /// With pending bit handling disabled, the pending bit is always set.
    pub fn set_pending_bit_enabled(&mut self, enabled: bool) {
        self.pending_bit_enabled = enabled;
    }

    pub fn set_pending_bit<Bytes: AsRef<[u8]>>(
        &mut self,
        address: &Address<Bytes>,
        pending: bool,
    ) -> Result<(), AckDataError> {
        self.update(address, |entry| {
            entry.pending = pending;
            Ok(())
        })
    }

    pub fn is_pending<Bytes: AsRef<[u8]>>(&self, address: &Address<Bytes>) -> bool {
        self.find(address.as_le_bytes())
            .is_some_and(|entry| entry.pending)
    }

    /// Sets the header IEs attached to acknowledgments sent to the given
    /// address.
    pub fn set_ie_data<Bytes: AsRef<[u8]>>(
        &mut self,
        address: &Address<Bytes>,
        ie_data: &[u8],
    ) -> Result<(), AckDataError> {
        if ie_data.len() > IE_LEN {
            return Err(AckDataError::IeDataTooLong);
        }
        validate_header_ies(ie_data).map_err(|_| AckDataError::MalformedIeData)?;

        self.update(address, |entry| {
            entry.ie_data.clear();
            entry
                .ie_data
                .extend_from_slice(ie_data)
                .map_err(|_| AckDataError::IeDataTooLong)
        })
    }

    pub fn clear_ie_data<Bytes: AsRef<[u8]>>(
        &mut self,
        address: &Address<Bytes>,
    ) -> Result<(), AckDataError> {
        self.update(address, |entry| {
            entry.ie_data.clear();
            Ok(())
        })
    }

    /// Removes all entries.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, address: &[u8]) -> Option<&AckDataEntry<IE_LEN>> {
        if address.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|entry| entry.address.as_slice() == address)
    }

    /// Applies the update to the entry of the given address, creating it if
    /// necessary. Entries left without pending bit and IE data are removed.
    fn update<Bytes: AsRef<[u8]>>(
        &mut self,
        address: &Address<Bytes>,
        update: impl FnOnce(&mut AckDataEntry<IE_LEN>) -> Result<(), AckDataError>,
    ) -> Result<(), AckDataError> {
        let address = address.as_le_bytes();
        if address.is_empty() {
            return Err(AckDataError::AbsentAddress);
        }

        let position = match self
            .entries
            .iter()
            .position(|entry| entry.address.as_slice() == address)
        {
            Some(position) => position,
            None => {
                let entry = AckDataEntry {
                    address: Vec::from_slice(address).map_err(|_| AckDataError::AbsentAddress)?,
                    pending: false,
                    ie_data: Vec::new(),
                };
                self.entries
                    .push(entry)
                    .map_err(|_| AckDataError::TableFull)?;
                self.entries.len() - 1
            }
        };

        let result = update(&mut self.entries[position]);
        if self.entries[position].is_unused() {
            self.entries.swap_remove(position);
        }
        result
    }
}

impl<const N: usize, const IE_LEN: usize> AckPolicy for AckDataTable<N, IE_LEN> {
    fn pending_bit_should_be_set(&self, frame: &MpduParser<&[u8], MpduWithAllFields>) -> bool {
        if !self.pending_bit_enabled {
            return true;
        }

        let src_address = frame.addressing_fields().into_src_address();
        match self.source_match {
            SourceMatch::Thread => src_address.is_absent() || self.is_pending(&src_address),
            SourceMatch::Blacklist => !self.is_pending(&src_address),
        }
    }

    fn header_ie_for(&self, src_address: &Address<&[u8]>) -> Option<&[u8]> {
        self.find(src_address.as_le_bytes())
            .map(|entry| entry.ie_data.as_slice())
            .filter(|ie_data| !ie_data.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: [u8; 2] = [0x34, 0x12];
    const EXTENDED: [u8; 8] = [8, 7, 6, 5, 4, 3, 2, 1];

    // Data frames, IEEE 802.15.4-2006, PAN ID compression.
    const FROM_SHORT: [u8; 12] = [
        11, 0x41, 0x98, 0x01, 0xcd, 0xab, 0x78, 0x56, 0x34, 0x12, 0x00, 0x00,
    ];
    const FROM_EXTENDED: [u8; 18] = [
        17, 0x41, 0xd8, 0x01, 0xcd, 0xab, 0x78, 0x56, 8, 7, 6, 5, 4, 3, 2, 1, 0x00, 0x00,
    ];
    // Data frame without source address.
    const ANONYMOUS: [u8; 10] = [9, 0x01, 0x08, 0x01, 0xcd, 0xab, 0x78, 0x56, 0x00, 0x00];

    fn short() -> Address<&'static [u8]> {
        Address::from_le_bytes(&SHORT).unwrap()
    }

    fn extended() -> Address<&'static [u8]> {
        Address::from_le_bytes(&EXTENDED).unwrap()
    }

    fn pending(table: &AckDataTable<2, 8>, frame: &[u8]) -> bool {
        table.pending_bit_should_be_set(&MpduParser::parse(frame).unwrap())
    }

    #[test]
    fn thread_source_match() {
        let mut table = AckDataTable::<2, 8>::new(SourceMatch::Thread);
        assert!(!pending(&table, &FROM_SHORT));
        assert!(pending(&table, &ANONYMOUS));

        table.set_pending_bit(&short(), true).unwrap();
        assert!(pending(&table, &FROM_SHORT));
        assert!(!pending(&table, &FROM_EXTENDED));

        table.set_pending_bit_enabled(false);
        assert!(pending(&table, &FROM_EXTENDED));
    }

    #[test]
    fn blacklist_source_match() {
        let mut table = AckDataTable::<2, 8>::new(SourceMatch::Blacklist);
        assert!(pending(&table, &FROM_EXTENDED));

        table.set_pending_bit(&extended(), true).unwrap();
        assert!(!pending(&table, &FROM_EXTENDED));
        assert!(pending(&table, &FROM_SHORT));
        assert!(pending(&table, &ANONYMOUS));
    }

    #[test]
    fn ie_data() {
        let mut table = AckDataTable::<2, 8>::new(SourceMatch::Thread);
        let csl = [0x04, 0x0d, 0x01, 0x00, 0x02, 0x00];
        table.set_ie_data(&extended(), &csl).unwrap();
        assert_eq!(table.header_ie_for(&extended()), Some(&csl[..]));
        assert_eq!(table.header_ie_for(&short()), None);
        assert_eq!(table.header_ie_for(&Address::Absent), None);
        assert!(!table.is_pending(&extended()));

        assert_eq!(
            table.set_ie_data(&short(), &[0x04, 0x0d, 0x01]),
            Err(AckDataError::MalformedIeData)
        );
        assert_eq!(
            table.set_ie_data(&short(), &[0x80, 0x3f]),
            Err(AckDataError::MalformedIeData)
        );
        assert_eq!(
            table.set_ie_data(&short(), &[0x07, 0x0d, 0, 0, 0, 0, 0, 0, 0]),
            Err(AckDataError::IeDataTooLong)
        );
        assert_eq!(
            table.set_ie_data(&Address::<&[u8]>::Absent, &csl),
            Err(AckDataError::AbsentAddress)
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn entry_lifecycle() {
        let mut table = AckDataTable::<1, 8>::new(SourceMatch::Thread);
        table.set_pending_bit(&short(), true).unwrap();
        assert_eq!(
            table.set_pending_bit(&extended(), true),
            Err(AckDataError::TableFull)
        );

        table.set_ie_data(&short(), &[0x00, 0x0d]).unwrap();
        table.set_pending_bit(&short(), false).unwrap();
        assert_eq!(table.len(), 1);
        table.clear_ie_data(&short()).unwrap();
        assert!(table.is_empty());

        // Clearing an unknown entry doesn't leave an empty one behind.
        table.clear_ie_data(&extended()).unwrap();
        assert!(table.is_empty());

        table.set_pending_bit(&extended(), true).unwrap();
        table.reset();
        assert!(!table.is_pending(&extended()));
    }
}
