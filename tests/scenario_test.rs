use crypto_provider::{
    Core, OperationId, ParamRequest, ParamType, ParamValue, PROVIDER_NAME, Result, VERSION,
    constants::params,
    dispatch::terminated,
    error::{AlgorithmError, Error, FetchError, ParamError},
    params::Param,
};

// ----- Scenario -----

#[test]
fn test_negotiate_introspect_query_teardown() -> Result<()> {
    let provider = Core::new().load("fips")?;

    // descriptor enumeration
    let descriptors = provider.param_types()?;
    let names: Vec<&str> = terminated(descriptors).filter_map(|d| d.name).collect();
    for expected in [params::NAME, params::VERSION, params::BUILDINFO] {
        assert!(names.contains(&expected), "missing descriptor {}", expected);
    }

    // name parameter
    let mut request = [ParamRequest::utf8_ptr(params::NAME)];
    provider.get_params(&mut request)?;
    assert_eq!(request[0].value(), Some(&ParamValue::Utf8Ptr(PROVIDER_NAME)));

    // registered operation
    let digests = provider.query(OperationId::Digest)?;
    let sha256 = digests
        .iter()
        .find(|d| d.has_name("SHA2-256"))
        .expect("SHA2-256 registered");
    assert!(!sha256.properties.is_empty());

    provider.teardown();
    Ok(())
}

// ----- Parameter protocol -----

#[test]
fn test_descriptor_enumeration_is_idempotent() -> Result<()> {
    let provider = Core::new().load("fips")?;
    let before = provider.param_types()?;

    let mut request = [ParamRequest::utf8_ptr(params::VERSION)];
    provider.get_params(&mut request)?;

    let after = provider.param_types()?;
    assert_eq!(before, after);
    assert!(std::ptr::eq(before, after));
    Ok(())
}

#[test]
fn test_unknown_param_is_left_unfilled() -> Result<()> {
    let provider = Core::new().load("fips")?;
    let mut requests = [
        ParamRequest::utf8_ptr("no-such-param"),
        ParamRequest::utf8_ptr(params::VERSION),
    ];
    provider.get_params(&mut requests)?;

    assert!(!requests[0].is_filled());
    assert_eq!(requests[1].value(), Some(&ParamValue::Utf8Ptr(VERSION)));
    Ok(())
}

#[test]
fn test_type_mismatch_fails_whole_call() -> Result<()> {
    let provider = Core::new().load("fips")?;
    let mut requests = [
        ParamRequest::utf8_ptr(params::NAME),
        ParamRequest::integer(params::BUILDINFO),
    ];

    let result = provider.get_params(&mut requests);
    assert!(matches!(
        result,
        Err(Error::Param(ParamError::TypeMismatch {
            expected: ParamType::Integer,
            actual: ParamType::Utf8Ptr,
            ..
        }))
    ));
    assert!(requests.iter().all(|r| !r.is_filled()));
    Ok(())
}

#[test]
fn test_status_is_reported() -> Result<()> {
    let provider = Core::new().load("fips")?;
    let mut request = [ParamRequest::integer(params::STATUS)];
    provider.get_params(&mut request)?;
    assert_eq!(request[0].value().and_then(ParamValue::as_i64), Some(1));
    Ok(())
}

// ----- Algorithm query -----

#[test]
fn test_unregistered_operation_is_empty() -> Result<()> {
    let provider = Core::new().load("fips")?;
    for operation in [OperationId::Cipher, OperationId::Kdf, OperationId::Signature] {
        let result = provider.query(operation)?;
        assert!(result.is_empty());
    }
    Ok(())
}

#[test]
fn test_registered_lists_are_well_formed() -> Result<()> {
    let provider = Core::new().load("fips")?;
    for operation in [OperationId::Digest, OperationId::Mac] {
        let result = provider.query(operation)?;
        assert!(result.as_slice().last().is_some_and(|d| d.names.is_empty()));
        assert!(!result.is_empty());
        for descriptor in result.iter() {
            assert!(!descriptor.name().is_empty());
        }
    }
    Ok(())
}

#[test]
fn test_fetch_respects_properties() -> Result<()> {
    let provider = Core::new().load("fips")?;
    assert!(provider.fetch_digest("SHA384", "provider=fips").is_ok());
    assert!(matches!(
        provider.fetch_digest("SHA384", "provider=default"),
        Err(Error::Fetch(FetchError::NotFound { .. }))
    ));
    assert!(matches!(
        provider.fetch_digest("SHA384", "fips=="),
        Err(Error::Fetch(FetchError::InvalidPropertyQuery(_)))
    ));
    Ok(())
}

// ----- Digests -----

#[test]
fn test_digest_known_answers() -> Result<()> {
    let provider = Core::new().load("fips")?;
    let vectors = [
        ("SHA224", "23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7"),
        ("SHA256", "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"),
        (
            "SHA384",
            "cb00753f45a35e8bb5a03d699ac65007272c32ab0eded1631a8b605a43ff5bed8086072ba1e7cc2358baeca134c825a7",
        ),
        (
            "SHA512",
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f",
        ),
    ];

    for (name, expected) in vectors {
        let method = provider.fetch_digest(name, "fips=yes")?;
        assert_eq!(hex::encode(method.digest(b"abc")?), expected, "{}", name);
    }
    Ok(())
}

#[test]
fn test_streaming_digest_and_clone() -> Result<()> {
    let provider = Core::new().load("fips")?;
    let method = provider.fetch_digest("SHA256", "")?;

    let mut ctx = method.new_context()?;
    ctx.update(b"a")?;
    let mut copy = ctx.try_clone()?;
    ctx.update(b"bc")?;
    copy.update(b"bc")?;

    assert_eq!(ctx.finalize()?, method.digest(b"abc")?);
    assert_eq!(copy.finalize()?, method.digest(b"abc")?);

    // finalized contexts need a reset before reuse
    assert!(matches!(ctx.update(b"x"), Err(AlgorithmError::Finalized)));
    ctx.reset()?;
    ctx.update(b"abc")?;
    assert_eq!(ctx.finalize()?, method.digest(b"abc")?);
    Ok(())
}

// ----- HMAC -----

#[test]
fn test_hmac_sha256_vectors() -> Result<()> {
    let provider = Core::new().load("fips")?;
    let hmac = provider.fetch_mac("HMAC", "fips=yes")?;

    let cases: [(Vec<u8>, &[u8], &str); 3] = [
        (
            vec![0x0b; 20],
            b"Hi There",
            "b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7",
        ),
        (
            b"Jefe".to_vec(),
            b"what do ya want for nothing?",
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843",
        ),
        (
            vec![0xaa; 131],
            b"Test Using Larger Than Block-Size Key - Hash Key First",
            "60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54",
        ),
    ];

    for (key, data, expected) in cases {
        let tag = hmac.mac(&[], &key, data)?;
        assert_eq!(hex::encode(tag), expected);
    }
    Ok(())
}

#[test]
fn test_hmac_digest_selection() -> Result<()> {
    let provider = Core::new().load("fips")?;
    let hmac = provider.fetch_mac("HMAC", "")?;

    let settings = [Param::utf8_string(params::MAC_DIGEST, "SHA512")];
    let tag = hmac.mac(&settings, &[0x0b; 20], b"Hi There")?;
    assert_eq!(
        hex::encode(tag),
        "87aa7cdea5ef619d4ff0b4241a1d6cb02379f4e2ce4ec2787ad0b30545e17cdedaa833b7d6b8a702038b274eaea3f4e4be9d914eeb61f1702e696c203a126854"
    );

    let unknown = [Param::utf8_string(params::MAC_DIGEST, "MD5")];
    assert!(matches!(
        hmac.mac(&unknown, b"key", b"data"),
        Err(AlgorithmError::Fetch(FetchError::NotFound { .. }))
    ));
    Ok(())
}

#[test]
fn test_hmac_verify_and_lifecycle() -> Result<()> {
    let provider = Core::new().load("fips")?;
    let hmac = provider.fetch_mac("HMAC", "")?;
    let tag = hmac.mac(&[], b"key", b"message")?;

    let mut ctx = hmac.new_context()?;
    assert!(matches!(ctx.update(b"early"), Err(AlgorithmError::NotInitialized)));

    ctx.init(b"key")?;
    ctx.update(b"mess")?;
    let mut copy = ctx.try_clone()?;
    ctx.update(b"age")?;
    copy.update(b"age")?;

    assert!(ctx.verify(&tag)?);
    assert!(!copy.verify(&[0u8; 32])?);
    assert!(matches!(ctx.finalize(), Err(AlgorithmError::Finalized)));
    Ok(())
}
