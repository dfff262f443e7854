//! Multi-signer attestation validation.
//!
//! Decoded price points are worthless until this module has checked, per
//! token: the attested block range brackets the execution block, the
//! attestation is fresh enough, enough *distinct authorized* signers signed
//! the canonical payload, and the price bounds are ordered. A batch
//! validates atomically — one bad token rejects the whole proof and nothing
//! downstream sees a partial result.
//!
//! The validator holds verifying keys only. Signing happens in keeper
//! tooling and tests; no secret material lives in this crate.

use std::collections::HashSet;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use openperp_types::{
    BlockContext, PerpError, PriceBounds, PricePoint, Result, ValidatedPrices, constants,
};

/// One oracle signer's signature over a token's attestation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSignature {
    /// The signer's public identity.
    pub signer: VerifyingKey,
    /// Ed25519 signature over [`PricePoint::signing_payload`].
    pub signature: Signature,
}

impl OracleSignature {
    /// Sign a price point. Used by keeper tooling and tests.
    #[must_use]
    pub fn sign(key: &SigningKey, point: &PricePoint) -> Self {
        Self {
            signer: key.verifying_key(),
            signature: key.sign(&point.signing_payload()),
        }
    }

    /// Verify this signature against a price point's payload.
    #[must_use]
    pub fn verifies(&self, point: &PricePoint) -> bool {
        self.signer
            .verify(&point.signing_payload(), &self.signature)
            .is_ok()
    }
}

/// The set of oracle identities whose signatures count toward the
/// threshold.
#[derive(Debug, Clone, Default)]
pub struct OracleSignerSet {
    signers: HashSet<[u8; 32]>,
}

impl OracleSignerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Authorize a signer. Idempotent.
    pub fn register(&mut self, key: &VerifyingKey) {
        self.signers.insert(key.to_bytes());
    }

    /// Remove a signer's authorization.
    pub fn revoke(&mut self, key: &VerifyingKey) {
        self.signers.remove(&key.to_bytes());
    }

    #[must_use]
    pub fn is_authorized(&self, key: &VerifyingKey) -> bool {
        self.signers.contains(&key.to_bytes())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.signers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }
}

/// Everything validation needs besides the proof itself. Assembled by the
/// settlement engine from its config and the data store.
#[derive(Debug, Clone, Copy)]
pub struct AttestationContext {
    /// The block/timestamp the call executes at.
    pub block: BlockContext,
    /// Distinct valid signers required per token.
    pub signer_threshold: usize,
    /// Maximum accepted attestation age, seconds.
    pub max_price_age_secs: u64,
}

/// Validates decoded price points against signer and recency policy.
#[derive(Debug, Clone, Default)]
pub struct PriceAttestationValidator {
    signer_set: OracleSignerSet,
}

impl PriceAttestationValidator {
    #[must_use]
    pub fn new(signer_set: OracleSignerSet) -> Self {
        Self { signer_set }
    }

    #[must_use]
    pub fn signer_set(&self) -> &OracleSignerSet {
        &self.signer_set
    }

    pub fn signer_set_mut(&mut self) -> &mut OracleSignerSet {
        &mut self.signer_set
    }

    /// Validate a batch of price points.
    ///
    /// `signatures[i]` holds the signatures over `points[i]`. All four
    /// checks run per token; the first failure rejects the whole batch
    /// with the offending token identified. On success every point lands
    /// in the returned [`ValidatedPrices`], scaled to protocol precision.
    pub fn validate(
        &self,
        points: &[PricePoint],
        signatures: &[Vec<OracleSignature>],
        ctx: &AttestationContext,
    ) -> Result<ValidatedPrices> {
        if signatures.len() != points.len() {
            return Err(PerpError::MalformedProof {
                reason: format!(
                    "{} signature sets for {} price points",
                    signatures.len(),
                    points.len()
                ),
            });
        }

        let mut validated = ValidatedPrices::new();
        for (point, sigs) in points.iter().zip(signatures) {
            self.validate_point(point, sigs, ctx)?;
            validated.insert(
                point.token,
                PriceBounds {
                    min: point.scaled_min(),
                    max: point.scaled_max(),
                },
            );
        }

        tracing::debug!(
            tokens = points.len(),
            block = ctx.block.number,
            "price attestation batch validated"
        );
        Ok(validated)
    }

    fn validate_point(
        &self,
        point: &PricePoint,
        signatures: &[OracleSignature],
        ctx: &AttestationContext,
    ) -> Result<()> {
        if ctx.block.number < point.min_block || ctx.block.number > point.max_block {
            return Err(PerpError::StalePriceRange {
                token: point.token,
                min_block: point.min_block,
                max_block: point.max_block,
                current_block: ctx.block.number,
            });
        }

        let age = ctx.block.timestamp.saturating_sub(point.timestamp);
        if age > ctx.max_price_age_secs {
            return Err(PerpError::PriceTooOld {
                token: point.token,
                age,
                max_age: ctx.max_price_age_secs,
            });
        }

        if signatures.len() > constants::MAX_ORACLE_SIGNERS {
            return Err(PerpError::MalformedProof {
                reason: format!(
                    "token {}: {} signatures exceeds cap {}",
                    point.token,
                    signatures.len(),
                    constants::MAX_ORACLE_SIGNERS
                ),
            });
        }

        // Count distinct authorized signers with a valid signature.
        // Repeats of one signer count once; unknown signers count never.
        let mut counted: HashSet<[u8; 32]> = HashSet::with_capacity(signatures.len());
        for sig in signatures {
            if self.signer_set.is_authorized(&sig.signer)
                && sig.verifies(point)
                && counted.insert(sig.signer.to_bytes())
                && counted.len() >= ctx.signer_threshold
            {
                break;
            }
        }
        if counted.len() < ctx.signer_threshold {
            return Err(PerpError::InsufficientSigners {
                token: point.token,
                valid: counted.len(),
                required: ctx.signer_threshold,
            });
        }

        if point.min_price > point.max_price {
            return Err(PerpError::InvertedPriceBounds {
                token: point.token,
                min: point.min_price,
                max: point.max_price,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openperp_types::Address;
    use primitive_types::U256;

    fn signing_key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    fn make_point(seed: u8) -> PricePoint {
        PricePoint {
            token: Address([seed; 32]),
            min_price: U256::from(5_000u64),
            max_price: U256::from(5_500u64),
            decimals: 4,
            min_block: 100,
            max_block: 200,
            timestamp: 1_700_000_000,
        }
    }

    fn ctx(threshold: usize) -> AttestationContext {
        AttestationContext {
            block: BlockContext::new(150, 1_700_000_100),
            signer_threshold: threshold,
            max_price_age_secs: 3_600,
        }
    }

    fn validator_with_signers(seeds: &[u8]) -> PriceAttestationValidator {
        let mut set = OracleSignerSet::new();
        for &seed in seeds {
            set.register(&signing_key(seed).verifying_key());
        }
        PriceAttestationValidator::new(set)
    }

    #[test]
    fn single_signer_batch_validates() {
        let validator = validator_with_signers(&[1]);
        let point = make_point(10);
        let sigs = vec![vec![OracleSignature::sign(&signing_key(1), &point)]];

        let validated = validator.validate(&[point], &sigs, &ctx(1)).unwrap();
        let bounds = validated.require(Address([10u8; 32])).unwrap();
        assert_eq!(bounds.min, U256::from(50_000_000u64));
        assert_eq!(bounds.max, U256::from(55_000_000u64));
    }

    #[test]
    fn threshold_of_three_needs_three_distinct() {
        let validator = validator_with_signers(&[1, 2, 3]);
        let point = make_point(10);

        let two = vec![vec![
            OracleSignature::sign(&signing_key(1), &point),
            OracleSignature::sign(&signing_key(2), &point),
        ]];
        let err = validator
            .validate(std::slice::from_ref(&point), &two, &ctx(3))
            .unwrap_err();
        assert!(
            matches!(err, PerpError::InsufficientSigners { valid: 2, required: 3, .. }),
            "got: {err}"
        );

        let three = vec![vec![
            OracleSignature::sign(&signing_key(1), &point),
            OracleSignature::sign(&signing_key(2), &point),
            OracleSignature::sign(&signing_key(3), &point),
        ]];
        assert!(validator.validate(&[point], &three, &ctx(3)).is_ok());
    }

    #[test]
    fn repeated_signer_counts_once() {
        let validator = validator_with_signers(&[1, 2]);
        let point = make_point(10);
        let sigs = vec![vec![
            OracleSignature::sign(&signing_key(1), &point),
            OracleSignature::sign(&signing_key(1), &point),
        ]];
        let err = validator.validate(&[point], &sigs, &ctx(2)).unwrap_err();
        assert!(matches!(
            err,
            PerpError::InsufficientSigners { valid: 1, .. }
        ));
    }

    #[test]
    fn unauthorized_signer_ignored() {
        let validator = validator_with_signers(&[1]);
        let point = make_point(10);
        // Key 9 was never registered.
        let sigs = vec![vec![OracleSignature::sign(&signing_key(9), &point)]];
        let err = validator.validate(&[point], &sigs, &ctx(1)).unwrap_err();
        assert!(matches!(err, PerpError::InsufficientSigners { .. }));
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let validator = validator_with_signers(&[1]);
        let signed = make_point(10);
        let mut tampered = signed.clone();
        tampered.max_price = U256::from(9_999u64);
        let sigs = vec![vec![OracleSignature::sign(&signing_key(1), &signed)]];
        let err = validator.validate(&[tampered], &sigs, &ctx(1)).unwrap_err();
        assert!(matches!(err, PerpError::InsufficientSigners { .. }));
    }

    #[test]
    fn superset_of_valid_signers_still_validates() {
        // Threshold monotonicity: adding signatures never breaks a batch
        // that validated.
        let validator = validator_with_signers(&[1, 2, 3]);
        let point = make_point(10);
        let mut sigs = vec![
            OracleSignature::sign(&signing_key(1), &point),
            OracleSignature::sign(&signing_key(2), &point),
        ];
        assert!(
            validator
                .validate(std::slice::from_ref(&point), &[sigs.clone()], &ctx(2))
                .is_ok()
        );

        sigs.push(OracleSignature::sign(&signing_key(3), &point));
        sigs.push(OracleSignature::sign(&signing_key(9), &point)); // unauthorized extra
        assert!(validator.validate(&[point], &[sigs], &ctx(2)).is_ok());
    }

    #[test]
    fn block_outside_range_rejected() {
        let validator = validator_with_signers(&[1]);
        let point = make_point(10);
        let sigs = vec![vec![OracleSignature::sign(&signing_key(1), &point)]];

        let mut early = ctx(1);
        early.block.number = 99;
        let err = validator
            .validate(std::slice::from_ref(&point), &sigs, &early)
            .unwrap_err();
        assert!(matches!(err, PerpError::StalePriceRange { .. }));

        let mut late = ctx(1);
        late.block.number = 201;
        let err = validator.validate(&[point], &sigs, &late).unwrap_err();
        assert!(matches!(err, PerpError::StalePriceRange { .. }));
    }

    #[test]
    fn boundary_blocks_accepted() {
        let validator = validator_with_signers(&[1]);
        let point = make_point(10);
        let sigs = vec![vec![OracleSignature::sign(&signing_key(1), &point)]];

        for number in [100, 200] {
            let mut at = ctx(1);
            at.block.number = number;
            assert!(
                validator
                    .validate(std::slice::from_ref(&point), &sigs, &at)
                    .is_ok(),
                "block {number} is inside the inclusive range"
            );
        }
    }

    #[test]
    fn old_attestation_rejected() {
        let validator = validator_with_signers(&[1]);
        let point = make_point(10);
        let sigs = vec![vec![OracleSignature::sign(&signing_key(1), &point)]];

        let mut stale = ctx(1);
        stale.block.timestamp = point.timestamp + 3_601;
        let err = validator.validate(&[point], &sigs, &stale).unwrap_err();
        assert!(matches!(err, PerpError::PriceTooOld { age: 3_601, .. }));
    }

    #[test]
    fn inverted_bounds_rejected() {
        let validator = validator_with_signers(&[1]);
        let mut point = make_point(10);
        point.min_price = U256::from(6_000u64);
        let sigs = vec![vec![OracleSignature::sign(&signing_key(1), &point)]];
        let err = validator.validate(&[point], &sigs, &ctx(1)).unwrap_err();
        assert!(matches!(err, PerpError::InvertedPriceBounds { .. }));
    }

    #[test]
    fn one_bad_token_rejects_whole_batch() {
        let validator = validator_with_signers(&[1]);
        let good = make_point(10);
        let bad = make_point(11);
        let sigs = vec![
            vec![OracleSignature::sign(&signing_key(1), &good)],
            vec![], // no signatures for the second token
        ];
        let err = validator
            .validate(&[good, bad], &sigs, &ctx(1))
            .unwrap_err();
        assert!(
            matches!(err, PerpError::InsufficientSigners { token, .. } if token == Address([11u8; 32]))
        );
    }

    #[test]
    fn signature_set_count_must_match() {
        let validator = validator_with_signers(&[1]);
        let point = make_point(10);
        let err = validator.validate(&[point], &[], &ctx(1)).unwrap_err();
        assert!(matches!(err, PerpError::MalformedProof { .. }));
    }

    #[test]
    fn revoked_signer_stops_counting() {
        let mut validator = validator_with_signers(&[1]);
        let point = make_point(10);
        let sigs = vec![vec![OracleSignature::sign(&signing_key(1), &point)]];
        assert!(
            validator
                .validate(std::slice::from_ref(&point), &sigs, &ctx(1))
                .is_ok()
        );

        validator
            .signer_set_mut()
            .revoke(&signing_key(1).verifying_key());
        assert!(validator.validate(&[point], &sigs, &ctx(1)).is_err());
    }
}
