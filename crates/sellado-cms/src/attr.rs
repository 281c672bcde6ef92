#![forbid(unsafe_code)]

//! Attribute construction and lookup.
//!
//! The signed-attribute builders here produce the values a signer
//! needs: content type, signing time, message digest, the signer's
//! serial number, ESS signing-certificate-v2 and caller extras.

use crate::oid;
use der::asn1::{
    Any, GeneralizedTime, ObjectIdentifier, OctetString, PrintableStringRef, SetOfVec, UtcTime,
    Utf8StringRef,
};
use der::{DateTime, Decode, Encode, Sequence};
use sellado_core::{DigestAlgorithm, Error};
use spki::AlgorithmIdentifierOwned;
use std::collections::BTreeMap;
use std::time::SystemTime;
use x509_cert::attr::Attribute;
use x509_cert::time::Time;

/// ESSCertIDv2 without the optional issuer serial.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct EssCertIdV2 {
    /// Absent when the hash is SHA-256, the ASN.1 default.
    #[asn1(optional = "true")]
    pub hash_algorithm: Option<AlgorithmIdentifierOwned>,
    pub cert_hash: OctetString,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SigningCertificateV2 {
    pub certs: Vec<EssCertIdV2>,
}

// ── DER plumbing ─────────────────────────────────────────────────────

pub(crate) fn encoding_error(context: &str) -> impl Fn(der::Error) -> Error + '_ {
    move |e| Error::Encoding(format!("{context}: {e}"))
}

pub(crate) fn malformed(context: &str) -> impl Fn(der::Error) -> Error + '_ {
    move |e| Error::MalformedContainer(format!("{context}: {e}"))
}

/// Re-home any encodable value as an `ANY`.
pub(crate) fn to_any<T: Encode>(value: &T) -> Result<Any, Error> {
    let der = value.to_der().map_err(encoding_error("attribute value"))?;
    Any::from_der(&der).map_err(encoding_error("attribute value"))
}

pub fn attribute(oid: ObjectIdentifier, value: Any) -> Result<Attribute, Error> {
    let values = SetOfVec::try_from(vec![value]).map_err(encoding_error("attribute values"))?;
    Ok(Attribute { oid, values })
}

/// Attribute set in DER order; duplicate attributes are rejected.
pub fn attribute_set(attrs: Vec<Attribute>) -> Result<SetOfVec<Attribute>, Error> {
    SetOfVec::try_from(attrs).map_err(encoding_error("attribute set"))
}

pub fn algorithm_identifier(oid: &str) -> Result<AlgorithmIdentifierOwned, Error> {
    let oid = ObjectIdentifier::new(oid)
        .map_err(|e| Error::UnknownAlgorithm(format!("invalid algorithm OID {oid}: {e}")))?;
    Ok(AlgorithmIdentifierOwned {
        oid,
        parameters: None,
    })
}

// ── Builders ─────────────────────────────────────────────────────────

pub fn content_type(content: ObjectIdentifier) -> Result<Attribute, Error> {
    attribute(oid::CONTENT_TYPE, to_any(&content)?)
}

/// Signing time as UTCTime, or GeneralizedTime from 2050 on.
pub fn signing_time(now: SystemTime) -> Result<Attribute, Error> {
    let dt = DateTime::from_system_time(now).map_err(encoding_error("signing time"))?;
    let time = if dt.year() < 2050 {
        Time::UtcTime(UtcTime::from_date_time(dt).map_err(encoding_error("signing time"))?)
    } else {
        Time::GeneralTime(GeneralizedTime::from_date_time(dt))
    };
    attribute(oid::SIGNING_TIME, to_any(&time)?)
}

pub fn message_digest(digest: &[u8]) -> Result<Attribute, Error> {
    let value = OctetString::new(digest).map_err(encoding_error("message digest"))?;
    attribute(oid::MESSAGE_DIGEST, to_any(&value)?)
}

/// X.520 serialNumber carrying the decimal certificate serial.
pub fn serial_number(decimal: &str) -> Result<Attribute, Error> {
    let value = PrintableStringRef::new(decimal).map_err(encoding_error("serial number"))?;
    attribute(oid::SERIAL_NUMBER, to_any(&value)?)
}

pub fn signing_certificate_v2(
    certificate_der: &[u8],
    digest: DigestAlgorithm,
) -> Result<Attribute, Error> {
    let hash_algorithm = match digest {
        DigestAlgorithm::Sha256 => None,
        other => Some(algorithm_identifier(other.oid())?),
    };
    let cert_hash = OctetString::new(sellado_crypto::digest(digest, certificate_der))
        .map_err(encoding_error("certificate hash"))?;
    let value = SigningCertificateV2 {
        certs: vec![EssCertIdV2 {
            hash_algorithm,
            cert_hash,
        }],
    };
    attribute(oid::SIGNING_CERTIFICATE_V2, to_any(&value)?)
}

/// Encode caller extras. Printable values become PrintableString,
/// other UTF-8 values UTF8String, anything else OCTET STRING.
pub fn extra_attributes(
    extras: &BTreeMap<String, Vec<u8>>,
    reserved: &[ObjectIdentifier],
) -> Result<Vec<Attribute>, Error> {
    let mut attrs = Vec::with_capacity(extras.len());
    for (key, value) in extras {
        let oid = ObjectIdentifier::new(key)
            .map_err(|e| Error::Configuration(format!("invalid attribute OID {key}: {e}")))?;
        if reserved.contains(&oid) {
            return Err(Error::Configuration(format!(
                "attribute {key} is set by the signer and cannot be overridden"
            )));
        }
        attrs.push(attribute(oid, encode_extra_value(value)?)?);
    }
    Ok(attrs)
}

fn encode_extra_value(value: &[u8]) -> Result<Any, Error> {
    if !value.is_empty() && value.iter().all(|b| is_printable(*b)) {
        let s = PrintableStringRef::new(value).map_err(encoding_error("extra attribute"))?;
        return to_any(&s);
    }
    if let Ok(text) = std::str::from_utf8(value) {
        let s = Utf8StringRef::new(text).map_err(encoding_error("extra attribute"))?;
        return to_any(&s);
    }
    let s = OctetString::new(value).map_err(encoding_error("extra attribute"))?;
    to_any(&s)
}

fn is_printable(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b" '()+,-./:=?".contains(&b)
}

// ── Lookup ───────────────────────────────────────────────────────────

pub fn find<'a>(attrs: &'a SetOfVec<Attribute>, oid: ObjectIdentifier) -> Option<&'a Attribute> {
    attrs.iter().find(|a| a.oid == oid)
}

/// The single value of attribute `oid`, if present.
pub fn single_value<'a>(
    attrs: &'a SetOfVec<Attribute>,
    oid: ObjectIdentifier,
) -> Result<Option<&'a Any>, Error> {
    match find(attrs, oid) {
        None => Ok(None),
        Some(attr) if attr.values.len() == 1 => Ok(attr.values.iter().next()),
        Some(attr) => Err(Error::MalformedContainer(format!(
            "attribute {oid} carries {} values",
            attr.values.len()
        ))),
    }
}

/// The messageDigest value of a signed-attribute set.
pub fn read_message_digest(attrs: &SetOfVec<Attribute>) -> Result<Option<Vec<u8>>, Error> {
    let Some(value) = single_value(attrs, oid::MESSAGE_DIGEST)? else {
        return Ok(None);
    };
    let der = value.to_der().map_err(malformed("message digest"))?;
    let digest = OctetString::from_der(&der).map_err(malformed("message digest"))?;
    Ok(Some(digest.as_bytes().to_vec()))
}

/// The textual value of a string-typed attribute.
pub fn read_string(attrs: &SetOfVec<Attribute>, oid: ObjectIdentifier) -> Result<Option<String>, Error> {
    let Some(value) = single_value(attrs, oid)? else {
        return Ok(None);
    };
    let text = std::str::from_utf8(value.value())
        .map_err(|e| Error::MalformedContainer(format!("attribute {oid} is not text: {e}")))?;
    Ok(Some(text.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::asn1::PrintableString;
    use der::Tagged;

    #[test]
    fn test_message_digest_round_trip() {
        let attrs = attribute_set(vec![message_digest(&[7u8; 32]).unwrap()]).unwrap();
        assert_eq!(read_message_digest(&attrs).unwrap(), Some(vec![7u8; 32]));
    }

    #[test]
    fn test_signing_time_is_utc_time() {
        let attr = signing_time(SystemTime::now()).unwrap();
        let value = attr.values.iter().next().unwrap();
        assert_eq!(value.tag(), der::Tag::UtcTime);
    }

    #[test]
    fn test_serial_number_printable() {
        let attrs = attribute_set(vec![serial_number("112394521950").unwrap()]).unwrap();
        assert_eq!(
            read_string(&attrs, oid::SERIAL_NUMBER).unwrap().as_deref(),
            Some("112394521950")
        );
        let value = single_value(&attrs, oid::SERIAL_NUMBER).unwrap().unwrap();
        let decoded = PrintableString::from_der(&value.to_der().unwrap()).unwrap();
        assert_eq!(decoded.as_str(), "112394521950");
    }

    #[test]
    fn test_extra_attribute_encodings() {
        let mut extras = BTreeMap::new();
        extras.insert("1.3.6.1.4.1.99999.1".to_owned(), b"Policy 1.0".to_vec());
        extras.insert("1.3.6.1.4.1.99999.2".to_owned(), "año".as_bytes().to_vec());
        extras.insert("1.3.6.1.4.1.99999.3".to_owned(), vec![0xff, 0x00]);
        let attrs = extra_attributes(&extras, &[]).unwrap();
        let tags: Vec<_> = attrs
            .iter()
            .map(|a| a.values.iter().next().unwrap().tag())
            .collect();
        assert_eq!(
            tags,
            vec![der::Tag::PrintableString, der::Tag::Utf8String, der::Tag::OctetString]
        );
    }

    #[test]
    fn test_extra_attribute_validation() {
        let mut extras = BTreeMap::new();
        extras.insert("not-an-oid".to_owned(), b"x".to_vec());
        assert!(matches!(
            extra_attributes(&extras, &[]),
            Err(Error::Configuration(_))
        ));

        let mut reserved = BTreeMap::new();
        reserved.insert("1.2.840.113549.1.9.4".to_owned(), b"x".to_vec());
        assert!(matches!(
            extra_attributes(&reserved, &[oid::MESSAGE_DIGEST]),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_signing_certificate_v2_default_hash() {
        let attr = signing_certificate_v2(b"certificate", DigestAlgorithm::Sha256).unwrap();
        let value = attr.values.iter().next().unwrap();
        let decoded = SigningCertificateV2::from_der(&value.to_der().unwrap()).unwrap();
        assert!(decoded.certs[0].hash_algorithm.is_none());
        assert_eq!(
            decoded.certs[0].cert_hash.as_bytes(),
            sellado_crypto::digest(DigestAlgorithm::Sha256, b"certificate")
        );

        let attr = signing_certificate_v2(b"certificate", DigestAlgorithm::Sha512).unwrap();
        let value = attr.values.iter().next().unwrap();
        let decoded = SigningCertificateV2::from_der(&value.to_der().unwrap()).unwrap();
        assert!(decoded.certs[0].hash_algorithm.is_some());
    }
}
