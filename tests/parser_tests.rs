//! Integration tests for the long poll parsers, driven through the factory
//! the way the client dispatches them.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use sas_egm::codec::{calculate_and_append_crc, check_crc, Denomination};
use sas_egm::config::{SasClientConfig, SasGroups};
use sas_egm::parsers::bonus::{InitiateLegacyBonusPay, LegacyBonus, TaxStatus};
use sas_egm::parsers::control::{ConfigureBillDenominations, Shutdown};
use sas_egm::parsers::datetime::{CurrentDateAndTime, ReceiveDateAndTime};
use sas_egm::parsers::eft::{EftStatus, EftTransferResponse, EftTransferToGamingMachine};
use sas_egm::parsers::meters::{GamingMachineIdAndInformation, GamingMachineInfo, TotalCoinIn};
use sas_egm::parsers::validation::EnhancedValidationInformation;
use sas_egm::parsers::{AckResponse, MultiDenomPreambleParser, ParserFactory};

fn factory() -> ParserFactory {
    ParserFactory::new(&SasClientConfig::default())
}

#[test]
fn test_shutdown_acks() {
    let factory = factory();
    let calls = Arc::new(Mutex::new(0));
    let seen = calls.clone();
    factory
        .inject_handler::<Shutdown, _>(move |()| {
            *seen.lock().unwrap() += 1;
            AckResponse::Ack
        })
        .unwrap();

    let poll = calculate_and_append_crc(&[0x01, 0x01]);
    assert_eq!(factory.get(0x01).parse(&poll), Some(vec![0x01]));
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[test]
fn test_registered_without_handler_is_silent() {
    let poll = calculate_and_append_crc(&[0x01, 0x01]);
    assert!(factory().is_registered(0x01));
    assert_eq!(factory().get(0x01).parse(&poll), None);
}

#[test]
fn test_bill_denominations_reach_handler() {
    let factory = factory();
    let seen = Arc::new(Mutex::new(None));
    let store = seen.clone();
    factory
        .inject_handler::<ConfigureBillDenominations, _>(move |config| {
            *store.lock().unwrap() = Some(config);
            AckResponse::Ack
        })
        .unwrap();

    // $1 and $5 enabled, keep accepting after each bill.
    let poll = calculate_and_append_crc(&[0x01, 0x08, 0x05, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(factory.get(0x08).parse(&poll), Some(vec![0x01]));
    let config = seen.lock().unwrap().clone().unwrap();
    assert_eq!(config.denominations, vec![100, 500]);
    assert!(!config.disable_after_accept);

    // Same bills, acceptor disabled after each one.
    let poll = calculate_and_append_crc(&[0x01, 0x08, 0x05, 0x00, 0x00, 0x00, 0x01]);
    assert_eq!(factory.get(0x08).parse(&poll), Some(vec![0x01]));
    let config = seen.lock().unwrap().clone().unwrap();
    assert_eq!(config.denominations, vec![100, 500]);
    assert!(config.disable_after_accept);
}

/// Malformed requests are refused before the handler runs.
#[test]
fn test_malformed_requests_nack() {
    let factory = factory();
    factory
        .inject_handler::<ConfigureBillDenominations, _>(|_| AckResponse::Ack)
        .unwrap();
    factory
        .inject_handler::<InitiateLegacyBonusPay, _>(|_| AckResponse::Ack)
        .unwrap();

    let bad_action = calculate_and_append_crc(&[0x01, 0x08, 0x05, 0x00, 0x00, 0x00, 0x02]);
    assert_eq!(factory.get(0x08).parse(&bad_action), Some(vec![0x81]));

    let bad_bcd = calculate_and_append_crc(&[0x01, 0x8A, 0x00, 0x00, 0x0A, 0x00, 0x00]);
    assert_eq!(factory.get(0x8A).parse(&bad_bcd), Some(vec![0x81]));

    let bad_tax = calculate_and_append_crc(&[0x01, 0x8A, 0x00, 0x00, 0x10, 0x00, 0x03]);
    assert_eq!(factory.get(0x8A).parse(&bad_tax), Some(vec![0x81]));
}

#[test]
fn test_legacy_bonus_request() {
    let factory = factory();
    let seen = Arc::new(Mutex::new(None));
    let store = seen.clone();
    factory
        .inject_handler::<InitiateLegacyBonusPay, _>(move |bonus| {
            *store.lock().unwrap() = Some(bonus);
            AckResponse::Ack
        })
        .unwrap();

    let poll = calculate_and_append_crc(&[0x01, 0x8A, 0x00, 0x00, 0x10, 0x00, 0x01]);
    assert_eq!(factory.get(0x8A).parse(&poll), Some(vec![0x01]));
    assert_eq!(
        *seen.lock().unwrap(),
        Some(LegacyBonus {
            credits: 1000,
            tax_status: TaxStatus::NonDeductible,
            accounting_denom: Denomination::ONE_CENT,
        })
    );
}

/// Bonus credits are reported in the configured accounting denomination.
#[test]
fn test_legacy_bonus_uses_accounting_denomination() {
    let config = SasClientConfig {
        accounting_denom: 0x06,
        ..Default::default()
    };
    let factory = ParserFactory::new(&config);
    let seen = Arc::new(Mutex::new(None));
    let store = seen.clone();
    factory
        .inject_handler::<InitiateLegacyBonusPay, _>(move |bonus| {
            *store.lock().unwrap() = Some(bonus);
            AckResponse::Ack
        })
        .unwrap();

    let poll = calculate_and_append_crc(&[0x01, 0x8A, 0x00, 0x00, 0x00, 0x25, 0x00]);
    assert_eq!(factory.get(0x8A).parse(&poll), Some(vec![0x01]));
    let bonus = seen.lock().unwrap().unwrap();
    assert_eq!(bonus.credits, 25);
    assert_eq!(bonus.accounting_denom.code(), 0x06);
    assert_eq!(bonus.amount_millicents(), 2_500_000);
}

#[test]
fn test_meter_response() {
    let factory = factory();
    factory
        .inject_handler::<TotalCoinIn, _>(|_| Some(12_345_678))
        .unwrap();
    assert_eq!(
        factory.get(0x11).parse(&[0x01, 0x11]),
        Some(vec![0x01, 0x11, 0x12, 0x34, 0x56, 0x78])
    );

    // No meter available: no answer at all.
    factory.inject_handler::<TotalCoinIn, _>(|_| None).unwrap();
    assert_eq!(factory.get(0x11).parse(&[0x01, 0x11]), None);
}

#[test]
fn test_date_and_time_round_trip() {
    let factory = factory();
    let now = NaiveDate::from_ymd_opt(2026, 10, 16)
        .unwrap()
        .and_hms_opt(8, 30, 15)
        .unwrap();
    factory
        .inject_handler::<CurrentDateAndTime, _>(move |()| Some(now))
        .unwrap();
    assert_eq!(
        factory.get(0x7E).parse(&[0x01, 0x7E]),
        Some(vec![0x01, 0x7E, 0x10, 0x16, 0x20, 0x26, 0x08, 0x30, 0x15])
    );

    let received = Arc::new(Mutex::new(None));
    let store = received.clone();
    factory
        .inject_handler::<ReceiveDateAndTime, _>(move |value| {
            *store.lock().unwrap() = Some(value);
            AckResponse::Ack
        })
        .unwrap();
    let poll = calculate_and_append_crc(&[0x01, 0x7F, 0x10, 0x16, 0x20, 0x26, 0x08, 0x30, 0x15]);
    assert_eq!(factory.get(0x7F).parse(&poll), Some(vec![0x01]));
    assert_eq!(*received.lock().unwrap(), Some(now));
}

#[test]
fn test_eft_transfer_echoes_request() {
    let factory = factory();
    factory
        .inject_handler::<EftTransferToGamingMachine, _>(|request| {
            Some(EftTransferResponse::for_request(
                &request,
                EftStatus::Success,
                request.amount,
            ))
        })
        .unwrap();

    let poll = calculate_and_append_crc(&[0x01, 0x69, 0x00, 0x07, 0x00, 0x00, 0x25, 0x00]);
    assert_eq!(
        factory.get(0x69).parse(&poll),
        Some(vec![0x01, 0x69, 0x00, 0x07, 0x00, 0x00, 0x00, 0x25, 0x00])
    );
}

/// 0x4D: a bad function code is refused, an empty buffer is answered.
#[test]
fn test_enhanced_validation_two_tier() {
    let factory = factory();
    factory
        .inject_handler::<EnhancedValidationInformation, _>(|_| None)
        .unwrap();

    let bad = calculate_and_append_crc(&[0x01, 0x4D, 0x20]);
    assert_eq!(factory.get(0x4D).parse(&bad), Some(vec![0x81]));

    let current = calculate_and_append_crc(&[0x01, 0x4D, 0x00]);
    let response = factory.get(0x4D).parse(&current).unwrap();
    assert_eq!(response.len(), 33);
    assert_eq!(&response[..2], &[0x01, 0x4D]);
    assert!(response[2..].iter().all(|&b| b == 0));
}

#[test]
fn test_group_filtering_drops_eft() {
    let config = SasClientConfig {
        groups: SasGroups::GENERAL_CONTROL,
        ..Default::default()
    };
    let factory = ParserFactory::new(&config);
    assert!(factory.is_registered(0x01));
    assert!(!factory.is_registered(0x69));
    assert!(!factory.is_registered(0x4D));
    assert_eq!(factory.get(0x69).parse(&[0x01, 0x69]), None);
}

#[test]
fn test_multi_denom_meter() {
    let factory = factory();
    factory
        .inject_handler::<TotalCoinIn, _>(|request| {
            // Report the meter in units of the requested denomination.
            let cents = request.denomination?.cents()?;
            Some(10_000 / cents)
        })
        .unwrap();

    // Denomination 0x02 is 5 cents.
    let frame = calculate_and_append_crc(&[0x01, 0xB0, 0x02, 0x02, 0x11]);
    let response = MultiDenomPreambleParser::new().parse(&frame, &factory);
    assert_eq!(
        response,
        Some(vec![0x01, 0xB0, 0x06, 0x02, 0x11, 0x00, 0x00, 0x20, 0x00])
    );
}

#[test]
fn test_multi_denom_rejects_unaware_command() {
    let factory = factory();
    factory
        .inject_handler::<Shutdown, _>(|()| AckResponse::Ack)
        .unwrap();
    let frame = calculate_and_append_crc(&[0x01, 0xB0, 0x02, 0x01, 0x01]);
    assert_eq!(
        MultiDenomPreambleParser::new().parse(&frame, &factory),
        Some(vec![0x01, 0xB0, 0x02, 0x01, 0x01])
    );
}

#[test]
fn test_machine_info_response() {
    let factory = factory();
    factory
        .inject_handler::<GamingMachineIdAndInformation, _>(|_| {
            Some(GamingMachineInfo {
                game_id: "AT".into(),
                additional_id: "001".into(),
                denomination: 0x01,
                max_bet: 5,
                progressive_group: 0,
                game_options: 0x0001,
                paytable_id: "AB1234".into(),
                base_percentage: "9250".into(),
            })
        })
        .unwrap();
    let response = factory.get(0x1F).parse(&[0x01, 0x1F]).unwrap();
    assert_eq!(response.len(), 22);
    assert_eq!(&response[..4], &[0x01, 0x1F, b'A', b'T']);
    assert_eq!(&response[4..7], b"001");
    assert!(check_crc(&calculate_and_append_crc(&response)));
}
