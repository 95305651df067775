use dot15d4_frame::{
    constants::{
        FCS_LEN, FRAME_CONTROL_LEN, MAX_FRAME_BUFFER_LEN, PHY_HDR_LEN, PHY_MAX_PACKET_SIZE_127,
    },
    ie::{HEADER_IE_HDR_LEN, HEADER_TERMINATION_IE_2},
    AddressingMode, FrameControl, FrameType, FrameVersion, MpduParser, MpduWithAllFields, PanId,
};
use dot15d4_util::{trace, warn};

use crate::{
    aux_sec::{write_aux_sec_header, FrameCounterOrigin},
    cipher::{CipherError, CipherPreparer},
    const_config::MAC_PAN_ID,
    ies::IeFinalizer,
    policy::AckPolicy,
    security::{SecurityDirectory, SecurityError},
};

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AckError {
    /// No frame counter could be issued for the acknowledgment's key.
    CounterIssuance(SecurityError),
    /// The acknowledgment could not be readied for its security level.
    CipherPreparation(CipherError),
}

impl From<SecurityError> for AckError {
    fn from(err: SecurityError) -> Self {
        AckError::CounterIssuance(err)
    }
}

impl From<CipherError> for AckError {
    fn from(err: CipherError) -> Self {
        AckError::CipherPreparation(err)
    }
}

impl core::fmt::Display for AckError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AckError::CounterIssuance(err) => write!(f, "frame counter issuance failed: {err}"),
            AckError::CipherPreparation(err) => write!(f, "cipher preparation failed: {err}"),
        }
    }
}

/// Generates Enhanced Acknowledgments (Enh-Ack) for received frames.
///
/// The generator owns the buffer the acknowledgment is built in. It is reused
/// for every acknowledgment, so only one acknowledgment can be in flight per
/// generator. Devices that need to acknowledge on several radios at once need
/// one generator per radio.
///
/// The acknowledgment content depends on four collaborators:
/// - a [`SecurityDirectory`] issuing frame counters,
/// - an [`AckPolicy`] deciding on the frame pending bit and header IEs,
/// - an [`IeFinalizer`] stamping header IEs once their position is known,
/// - a [`CipherPreparer`] readying secured acknowledgments for encryption.
///
/// `()` may be used for the latter three to disable the respective feature.
#[derive(Debug)]
pub struct EnhAckGenerator<Sec, Policy, Ies, Cipher> {
    buffer: [u8; MAX_FRAME_BUFFER_LEN],
    pan_id: PanId<[u8; 2]>,
    frame_counter_origin: Option<FrameCounterOrigin>,
    security_directory: Sec,
    ack_policy: Policy,
    ie_finalizer: Ies,
    cipher_preparer: Cipher,
}

impl<Sec, Policy, Ies, Cipher> EnhAckGenerator<Sec, Policy, Ies, Cipher> {
    pub const fn new(
        security_directory: Sec,
        ack_policy: Policy,
        ie_finalizer: Ies,
        cipher_preparer: Cipher,
    ) -> Self {
        Self {
            buffer: [0; MAX_FRAME_BUFFER_LEN],
            pan_id: MAC_PAN_ID,
            frame_counter_origin: None,
            security_directory,
            ack_policy,
            ie_finalizer,
            cipher_preparer,
        }
    }

    /// The device's PAN ID. Used as destination PAN ID if the acknowledged
    /// frame carries no PAN ID.
    pub fn pan_id(&self) -> PanId<&[u8]> {
        PanId::new(self.pan_id.as_ref())
    }

    pub fn set_pan_id(&mut self, pan_id: PanId<[u8; 2]>) {
        self.pan_id = pan_id;
    }

    /// The last acknowledgment including its PHR. Empty (a zero PHR) after a
    /// failed build.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer[..PHY_HDR_LEN + self.buffer[0] as usize]
    }

    /// How the frame counter of the last acknowledgment was obtained, `None`
    /// if it was not secured or could not be built.
    pub fn frame_counter_origin(&self) -> Option<FrameCounterOrigin> {
        self.frame_counter_origin
    }

    pub fn security_directory_mut(&mut self) -> &mut Sec {
        &mut self.security_directory
    }

    pub fn ack_policy_mut(&mut self) -> &mut Policy {
        &mut self.ack_policy
    }

    pub fn ie_finalizer_mut(&mut self) -> &mut Ies {
        &mut self.ie_finalizer
    }

    pub fn cipher_preparer(&self) -> &Cipher {
        &self.cipher_preparer
    }

    pub fn cipher_preparer_mut(&mut self) -> &mut Cipher {
        &mut self.cipher_preparer
    }
}

impl<Sec, Policy, Ies, Cipher> EnhAckGenerator<Sec, Policy, Ies, Cipher>
where
    Sec: SecurityDirectory,
    Policy: AckPolicy,
    Ies: IeFinalizer,
    Cipher: CipherPreparer,
{
    /// Builds the acknowledgment for the given frame.
    ///
    /// Returns the acknowledgment including its PHR. The MIC and FCS are
    /// reserved but left zeroed. If no acknowledgment can be built, the
    /// buffer is cleared so that no partial frame can be transmitted.
    pub fn create(
        &mut self,
        frame: &MpduParser<&[u8], MpduWithAllFields>,
    ) -> Result<&[u8], AckError> {
        self.frame_counter_origin = None;
        match self.build(frame) {
            Ok(ack_length) => {
                trace!("enh-ack: {} bytes", ack_length);
                Ok(&self.buffer[..ack_length])
            }
            Err(err) => {
                warn!("enh-ack: {}", err);
                self.buffer.fill(0);
                self.frame_counter_origin = None;
                Err(err)
            }
        }
    }

    /// Writes the acknowledgment into the buffer and returns its length
    /// including the PHR.
    fn build(&mut self, frame: &MpduParser<&[u8], MpduWithAllFields>) -> Result<usize, AckError> {
        let Self {
            buffer,
            pan_id,
            frame_counter_origin,
            security_directory,
            ack_policy,
            ie_finalizer,
            cipher_preparer,
        } = self;

        let frame_addressing = frame.addressing_fields();
        let src_address = frame_addressing.into_src_address();
        let ie_data = ack_policy.header_ie_for(&src_address);

        // The MIC and FCS are reserved but not written, stale bytes must not
        // survive from the last acknowledgment.
        buffer.fill(0);
        let mut ack = MpduParser::new(&mut buffer[..]);

        let frame_fc = frame.frame_control();
        let frame_control = FrameControl::new()
            .with_frame_type(FrameType::Ack)
            .with_security_enabled(frame_fc.security_enabled())
            .with_frame_pending(ack_policy.pending_bit_should_be_set(frame))
            .with_pan_id_compression(frame_fc.pan_id_compression())
            .with_seq_nr_suppression(frame_fc.seq_nr_suppression())
            .with_ie_present(ie_data.is_some())
            .with_dst_addr_mode(src_address.addressing_mode())
            .with_frame_version(FrameVersion::Ieee802154)
            .with_src_addr_mode(AddressingMode::Absent);
        ack.set_frame_control(frame_control);
        ack.add_psdu_length(FRAME_CONTROL_LEN as u8);

        let valid_data_length = ack.valid_data_length();
        // Safety: The frame control was derived from a valid frame.
        let mut ack = ack
            .parse_frame_control(valid_data_length)
            .expect("invalid frame control");

        if let Some(seq_nr) = frame.sequence_number() {
            // Safety: Sequence number suppression is mirrored.
            ack.set_sequence_number(seq_nr)
                .expect("sequence number suppressed");
            ack.add_psdu_length(1);
        }

        let dst_pan_id = frame_addressing
            .src_pan_id()
            .or(frame_addressing.dst_pan_id())
            .unwrap_or(PanId::new(pan_id.as_ref()));
        let mut ack_addressing = ack.addressing_fields_mut();
        if let Some(mut ack_dst_pan_id) = ack_addressing.dst_pan_id_mut() {
            ack_dst_pan_id.as_mut().copy_from_slice(dst_pan_id.as_ref());
        }
        // Safety: The destination addressing mode was derived from the source
        //         address.
        ack_addressing
            .dst_address_mut()
            .set(&src_address)
            .expect("addressing mode mismatch");
        let addressing_length = ack_addressing.length() as u8;
        ack.add_psdu_length(addressing_length);

        let (mut ack, origin) = write_aux_sec_header(frame, ack, security_directory)?;
        *frame_counter_origin = origin;

        let secured = ack
            .security_control()
            .is_some_and(|security_control| security_control.security_level().is_protected());

        if let Some(ie_data) = ie_data {
            let termination_length = if secured { HEADER_IE_HDR_LEN } else { 0 };
            assert!(
                ack.psdu_length() as usize + ie_data.len() + termination_length + FCS_LEN
                    <= PHY_MAX_PACKET_SIZE_127,
                "IE data too long"
            );

            let offset_ies = ack.ies_offset();
            let ies = offset_ies..offset_ies + ie_data.len();
            let bytes = ack.as_bytes_mut();
            bytes[ies.clone()].copy_from_slice(ie_data);
            ie_finalizer.finalize(bytes, ies.clone());

            // Without security there's neither payload nor MIC after the
            // header IEs, so they need no termination.
            if secured {
                bytes[ies.end..ies.end + HEADER_IE_HDR_LEN]
                    .copy_from_slice(&HEADER_TERMINATION_IE_2);
            }
            ack.add_psdu_length((ie_data.len() + termination_length) as u8);
        }
        ack.add_psdu_length(FCS_LEN as u8);

        let valid_data_length = ack.valid_data_length();
        // Safety: Header IEs are well-formed and fit into the frame.
        let mut ack = ack
            .parse_ies(valid_data_length)
            .expect("invalid header IEs");

        if secured {
            cipher_preparer.prepare(&mut ack)?;
        }

        Ok(ack.valid_data_length())
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use static_cell::StaticCell;

    use super::*;
    use crate::{
        cipher::CcmStarPreparer,
        ies::CslIeWriter,
        policy::{AckDataTable, SourceMatch},
        security::{KeyStore, KeyTable, KEY_LEN},
    };
    use dot15d4_frame::{
        ie::CSL_IE_ID, Address, ExtendedAddress, HeaderTermination, KeyId, KeyIdMode,
        SecurityLevel,
    };

    const KEY: [u8; KEY_LEN] = [0x5a; KEY_LEN];
    const CSL_IE: [u8; 6] = [0x04, 0x0d, 0x00, 0x00, 0x00, 0x00];

    // Data frame, IEEE 802.15.4-2006, PAN ID compression, DSN 7, short
    // addressing, two payload bytes.
    const DATA_2006: [u8; 14] = [
        13, // PHR
        0x61, 0x98, // FCF
        0x07, // DSN
        0xcd, 0xab, // dst PAN ID
        0x78, 0x56, // dst address
        0x34, 0x12, // src address
        0x01, 0x02, // payload
        0x00, 0x00, // FCS
    ];

    // Data frame, IEEE 802.15.4-2015, ack request, PAN ID compression, DSN
    // 0x2a, short destination and extended source address, level 5, key id
    // mode 1, key index 1.
    const SECURED_2015: [u8; 31] = [
        30, // PHR
        0x69, 0xe8, // FCF
        0x2a, // DSN
        0xcd, 0xab, // dst PAN ID
        0x78, 0x56, // dst address
        0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01, // src address
        0x0d, // security control
        0x44, 0x33, 0x22, 0x11, // frame counter
        0x01, // key index
        0xaa, 0xbb, 0xcc, // payload
        0xde, 0xad, 0xbe, 0xef, // MIC
        0x00, 0x00, // FCS
    ];

    const EXT_SRC: [u8; 8] = [0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01];

    type Keys = RefCell<KeyTable<2>>;

    fn init_logger() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Trace)
            .is_test(true)
            .try_init();
    }

    fn keys() -> Keys {
        let keys = RefCell::new(KeyTable::new());
        keys.borrow_mut()
            .add_key(KeyIdMode::Index, &[1], KEY, false)
            .unwrap();
        keys
    }

    fn parse(frame: &[u8]) -> MpduParser<&[u8], MpduWithAllFields> {
        MpduParser::parse(frame).unwrap()
    }

    /// Records cipher preparations.
    #[derive(Default)]
    struct CountingPreparer {
        calls: usize,
        fail: Option<CipherError>,
    }

    impl CipherPreparer for CountingPreparer {
        fn prepare(
            &mut self,
            _: &mut MpduParser<&mut [u8], MpduWithAllFields>,
        ) -> Result<(), CipherError> {
            self.calls += 1;
            match self.fail {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn unsecured_ack() {
        init_logger();
        let mut generator =
            EnhAckGenerator::new(KeyTable::<1>::new(), (), (), CountingPreparer::default());

        let frame = parse(&DATA_2006);
        let ack = generator.create(&frame).unwrap();
        assert_eq!(ack, &[7, 0x42, 0x28, 0x07, 0x34, 0x12, 0x00, 0x00]);

        let ack = parse(ack);
        let fc = ack.frame_control();
        assert_eq!(fc.frame_type(), FrameType::Ack);
        assert_eq!(fc.frame_version(), FrameVersion::Ieee802154);
        assert_eq!(fc.src_addr_mode(), AddressingMode::Absent);
        assert!(!fc.security_enabled());
        assert!(!fc.frame_pending());
        assert!(!fc.ie_present());
        assert_eq!(ack.sequence_number(), Some(7));
        assert_eq!(ack.addressing_fields().dst_address().as_le_bytes(), &[0x34, 0x12]);
        assert_eq!(ack.addressing_fields().dst_pan_id(), None);
        assert_eq!(ack.aux_sec_header(), None);

        assert_eq!(generator.cipher_preparer().calls, 0);
        assert_eq!(generator.frame_counter_origin(), None);
    }

    #[test]
    fn secured_ack() {
        init_logger();
        let keys = keys();
        let mut generator = EnhAckGenerator::new(&keys, (), (), CountingPreparer::default());

        let frame = parse(&SECURED_2015);
        let ack = generator.create(&frame).unwrap();
        assert_eq!(
            ack,
            &[
                23, // PHR
                0x4a, 0x2c, // FCF
                0x2a, // DSN
                0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01, // dst address
                0x0d, // security control
                0x00, 0x00, 0x00, 0x00, // frame counter
                0x01, // key index
                0x00, 0x00, 0x00, 0x00, // MIC
                0x00, 0x00, // FCS
            ]
        );
        assert_eq!(
            generator.frame_counter_origin(),
            Some(FrameCounterOrigin::Issued(0))
        );
        assert_eq!(generator.cipher_preparer().calls, 1);

        // Each acknowledgment gets a fresh frame counter.
        let ack = generator.create(&frame).unwrap();
        let ack = parse(ack);
        assert_eq!(ack.frame_counter(), Some(1));
        assert_eq!(ack.mic_length(), 4);
        assert_eq!(
            generator.frame_counter_origin(),
            Some(FrameCounterOrigin::Issued(1))
        );
        assert_eq!(generator.cipher_preparer().calls, 2);
    }

    #[test]
    fn unprotected_ack() {
        init_logger();
        let keys = keys().into_inner();
        let mut generator = EnhAckGenerator::new(keys, (), (), CountingPreparer::default());

        // Level 0, the frame carries no MIC.
        let mut frame = SECURED_2015;
        frame[0] = 26;
        frame[16] = 0x08;
        let frame = parse(&frame[..27]);

        let ack = parse(generator.create(&frame).unwrap());
        assert_eq!(ack.frame_counter(), Some(0x11223344));
        assert_eq!(ack.key_id().and_then(|key_id| key_id.key_index()), Some(1));
        assert_eq!(ack.mic(), None);
        assert_eq!(
            generator.frame_counter_origin(),
            Some(FrameCounterOrigin::Mirrored)
        );
        assert_eq!(generator.cipher_preparer().calls, 0);
        // No counter was issued.
        let key_id = KeyId::new(KeyIdMode::Index, &[1u8][..]).unwrap();
        assert_eq!(generator.security_directory_mut().frame_counter(&key_id), Some(0));
    }

    #[test]
    fn counter_issuance_failure() {
        init_logger();
        let mut generator =
            EnhAckGenerator::new(KeyTable::<1>::new(), (), (), CountingPreparer::default());

        // Leave a previous acknowledgment in the buffer.
        generator.create(&parse(&DATA_2006)).unwrap();

        let frame = parse(&SECURED_2015);
        assert_eq!(
            generator.create(&frame),
            Err(AckError::CounterIssuance(SecurityError::KeyNotFound))
        );
        assert_eq!(generator.buffer(), &[0]);
        assert_eq!(generator.frame_counter_origin(), None);
        assert_eq!(generator.cipher_preparer().calls, 0);
    }

    #[test]
    fn cipher_preparation_failure() {
        init_logger();
        let preparer = CountingPreparer {
            calls: 0,
            fail: Some(CipherError::KeyNotFound),
        };
        let mut generator = EnhAckGenerator::new(keys().into_inner(), (), (), preparer);

        let frame = parse(&SECURED_2015);
        assert_eq!(
            generator.create(&frame),
            Err(AckError::CipherPreparation(CipherError::KeyNotFound))
        );
        assert_eq!(generator.buffer(), &[0]);
        assert_eq!(generator.cipher_preparer().calls, 1);
    }

    #[test]
    fn header_ies() {
        init_logger();
        let mut policy = AckDataTable::<2, 8>::new(SourceMatch::Thread);
        let ext_src = Address::from_le_bytes(&EXT_SRC).unwrap();
        policy.set_ie_data(&ext_src, &CSL_IE).unwrap();
        policy.set_pending_bit(&ext_src, true).unwrap();
        let keys = keys();
        let csl = CslIeWriter::new(0x0190, || 0x0042);
        let mut generator = EnhAckGenerator::new(&keys, policy, csl, CountingPreparer::default());

        let frame = parse(&SECURED_2015);
        let ack = parse(generator.create(&frame).unwrap());
        assert!(ack.frame_control().ie_present());
        assert!(ack.frame_control().frame_pending());
        assert_eq!(
            ack.header_ies(),
            Some(&[0x04, 0x0d, 0x42, 0x00, 0x90, 0x01][..])
        );
        assert_eq!(ack.header_termination(), Some(HeaderTermination::Payload));
        let ies = ack.ies_offset();
        assert_eq!(&ack.as_bytes()[ies + 6..ies + 8], &[0x80, 0x3f]);
        assert_eq!(ack.mac_payload(), None);
        assert_eq!(ack.psdu_length(), 23 + 6 + 2);

        let ie = ack.header_ie_iter().next().unwrap().unwrap();
        assert_eq!(ie.element_id(), CSL_IE_ID);
    }

    #[test]
    fn unterminated_header_ies() {
        init_logger();
        let mut policy = AckDataTable::<1, 8>::new(SourceMatch::Thread);
        let src = Address::from_le_bytes(&[0x34, 0x12]).unwrap();
        policy.set_ie_data(&src, &CSL_IE).unwrap();
        let mut generator = EnhAckGenerator::new(KeyTable::<1>::new(), policy, (), ());

        let ack = parse(generator.create(&parse(&DATA_2006)).unwrap());
        assert_eq!(ack.header_ies(), Some(&CSL_IE[..]));
        assert_eq!(ack.header_termination(), None);
        assert_eq!(ack.psdu_length(), 7 + 6);
    }

    #[test]
    fn unprotected_ack_with_header_ies() {
        init_logger();
        let mut policy = AckDataTable::<1, 8>::new(SourceMatch::Thread);
        let ext_src = Address::from_le_bytes(&EXT_SRC).unwrap();
        policy.set_ie_data(&ext_src, &CSL_IE).unwrap();
        let csl = CslIeWriter::new(0x0002, || 0x0001);
        let mut generator =
            EnhAckGenerator::new(keys().into_inner(), policy, csl, CountingPreparer::default());

        // Level 0, the frame carries no MIC.
        let mut frame = SECURED_2015;
        frame[0] = 26;
        frame[16] = 0x08;
        let frame = parse(&frame[..27]);

        let ack = generator.create(&frame).unwrap();
        assert_eq!(
            ack,
            &[
                25, 0x4a, 0x2e, 0x2a, // PHR, FCF, DSN
                0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01, // dst address
                0x08, 0x44, 0x33, 0x22, 0x11, 0x01, // aux security header
                0x04, 0x0d, 0x01, 0x00, 0x02, 0x00, // CSL IE
                0x00, 0x00, // FCS
            ]
        );

        // Nothing follows the header IEs, so they remain unterminated.
        let ack = parse(ack);
        assert_eq!(ack.header_ies(), Some(&[0x04, 0x0d, 0x01, 0x00, 0x02, 0x00][..]));
        assert_eq!(ack.header_termination(), None);
        assert_eq!(ack.frame_counter(), Some(0x11223344));
        assert_eq!(ack.mic(), None);
        assert_eq!(
            generator.frame_counter_origin(),
            Some(FrameCounterOrigin::Mirrored)
        );
        assert_eq!(generator.cipher_preparer().calls, 0);
    }

    #[test]
    fn pan_id_fallback() {
        init_logger();
        let mut generator = EnhAckGenerator::new(KeyTable::<1>::new(), (), (), ());
        assert_eq!(generator.pan_id().into_u16(), 0xffff);
        generator.set_pan_id(PanId::new_owned([0x2b, 0x1a]));
        assert_eq!(generator.pan_id().into_u16(), 0x1a2b);

        // All frames are IEEE 802.15.4-2015 frames.

        // Short source address only, no PAN ID compression: the frame carries
        // the source PAN ID.
        let frame = parse(&[9, 0x01, 0xa0, 0x07, 0xcd, 0xab, 0x34, 0x12, 0x00, 0x00]);
        let ack = parse(generator.create(&frame).unwrap());
        assert_eq!(
            ack.addressing_fields().dst_pan_id().map(|pan_id| pan_id.into_u16()),
            Some(0xabcd)
        );

        // Extended addresses without PAN ID compression: only the destination
        // PAN ID is present.
        let mut frame = [0u8; 24];
        frame[..6].copy_from_slice(&[23, 0x01, 0xec, 0x07, 0xef, 0xbe]);
        frame[6..14].copy_from_slice(&[1; 8]);
        frame[14..22].copy_from_slice(&EXT_SRC);
        let frame = parse(&frame);
        let ack = parse(generator.create(&frame).unwrap());
        assert_eq!(
            ack.addressing_fields().dst_pan_id().map(|pan_id| pan_id.into_u16()),
            Some(0xbeef)
        );
        assert_eq!(ack.addressing_fields().dst_address().as_le_bytes(), &EXT_SRC);

        // Short destination address with PAN ID compression: no PAN ID in the
        // frame but the acknowledgment needs one.
        let frame = parse(&[7, 0x41, 0x28, 0x07, 0x78, 0x56, 0x00, 0x00]);
        let ack = generator.create(&frame).unwrap();
        assert_eq!(ack, &[7, 0x42, 0x20, 0x07, 0x2b, 0x1a, 0x00, 0x00]);
        let ack = parse(ack);
        assert!(ack.addressing_fields().dst_address().is_absent());
    }

    #[test]
    fn sequence_number_suppression() {
        init_logger();
        let mut generator = EnhAckGenerator::new(KeyTable::<1>::new(), (), (), ());

        // IEEE 802.15.4-2015, sequence number suppressed, short source
        // address, PAN ID compression.
        let frame = parse(&[6, 0x41, 0xa1, 0x34, 0x12, 0x00, 0x00]);
        let ack = generator.create(&frame).unwrap();
        assert_eq!(ack, &[6, 0x42, 0x29, 0x34, 0x12, 0x00, 0x00]);
    }

    static KEYS: StaticCell<Keys> = StaticCell::new();

    #[test]
    fn ccm_star_preparation() {
        init_logger();
        let keys: &'static Keys = KEYS.init(keys());
        let preparer =
            CcmStarPreparer::new(keys, ExtendedAddress::new_owned([1, 2, 3, 4, 5, 6, 7, 8]));
        let mut generator = EnhAckGenerator::new(keys, (), (), preparer);

        let frame = parse(&SECURED_2015);
        generator.create(&frame).unwrap();
        let transformation = generator.cipher_preparer().prepared().unwrap();
        let key_id = KeyId::new(KeyIdMode::Index, &[1u8][..]).unwrap();
        assert_eq!(Some(transformation.key), keys.key(&key_id));
        assert_eq!(transformation.nonce[8..], [0, 0, 0, 0, SecurityLevel::EncMic32 as u8]);
        assert_eq!(transformation.auth_data, 1..18);
        assert_eq!(transformation.mic, 18..22);
    }
}
