//! Storage contract behaviour through atomic groups on the in-process ledger.

mod common;

use bytes::Bytes;

use algo_did::models::{BoxName, Method};
use algo_did::{Address, ErrorCode, LedgerClient, LedgerParams, OwnerKey, Status};
use common::*;

#[tokio::test]
async fn test_start_upload_requires_exact_payment() {
    let net = deploy(LedgerParams::default());
    let params = LedgerParams::default();
    let owner = OwnerKey::from_name("alice");
    let cost = upload_cost(&params, 1, 80);

    for amount in [cost - 1, cost + 1] {
        let err = net
            .ledger
            .submit_group(start_upload_group(&net, owner, 1, 80, amount))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPayment);
    }
    assert!(metadata(&net, &owner).await.is_none());

    net.ledger
        .submit_group(start_upload_group(&net, owner, 1, 80, cost))
        .await
        .unwrap();
    let record = metadata(&net, &owner).await.unwrap();
    assert_eq!(record.status, Status::Uploading);
    assert_eq!((record.start, record.end, record.end_size), (0, 0, 80));
}

#[tokio::test]
async fn test_payment_must_target_app_and_precede_call() {
    let net = deploy(LedgerParams::default());
    let owner = OwnerKey::from_name("alice");
    let cost = upload_cost(&LedgerParams::default(), 1, 80);

    let mut misdirected = start_upload_group(&net, owner, 1, 80, cost);
    misdirected[0] = algo_did::models::Transaction::Payment {
        sender: net.admin,
        receiver: Address::from_name("someone"),
        amount: cost,
    };
    let err = net.ledger.submit_group(misdirected).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidPayment);

    let unpaid = start_upload_group(&net, owner, 1, 80, cost).split_off(1);
    let err = net.ledger.submit_group(unpaid).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidPayment);
}

#[tokio::test]
async fn test_only_creator_may_call() {
    let net = deploy(LedgerParams::default());
    let stranger = Address::from_name("stranger");
    net.ledger.fund(stranger, 1_000_000);

    let call = algo_did::models::AppCall::new(
        stranger,
        net.app_id,
        Method::FinishUpload {
            owner: OwnerKey::from_name("alice"),
        },
    )
    .with_boxes([BoxName::Metadata(OwnerKey::from_name("alice"))]);

    let err = net.ledger.submit_group(vec![call.into()]).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthorized);
}

#[tokio::test]
async fn test_duplicate_upload_and_disjoint_ranges() {
    let params = LedgerParams::default();
    let net = deploy(params.clone());
    let alice = OwnerKey::from_name("alice");
    let bob = OwnerKey::from_name("bob");

    net.ledger
        .submit_group(start_upload_group(&net, alice, 3, 10, upload_cost(&params, 3, 10)))
        .await
        .unwrap();
    let err = net
        .ledger
        .submit_group(start_upload_group(&net, alice, 1, 10, upload_cost(&params, 1, 10)))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MetadataExists);

    net.ledger
        .submit_group(start_upload_group(&net, bob, 2, 10, upload_cost(&params, 2, 10)))
        .await
        .unwrap();

    let a = metadata(&net, &alice).await.unwrap();
    let b = metadata(&net, &bob).await.unwrap();
    assert_eq!((a.start, a.end), (0, 2));
    assert_eq!((b.start, b.end), (3, 4));
    assert_eq!(net.ledger.globals(net.app_id).unwrap().cursor, 5);
}

#[tokio::test]
async fn test_write_gating() {
    let params = LedgerParams::default();
    let net = deploy(params.clone());
    let owner = OwnerKey::from_name("alice");

    let err = net
        .ledger
        .submit_group(vec![write_call(&net, owner, 0, 0, b"x")])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MetadataNotFound);

    net.ledger
        .submit_group(start_upload_group(&net, owner, 1, 80, upload_cost(&params, 1, 80)))
        .await
        .unwrap();

    let cases = [
        (write_call(&net, owner, 1, 0, b"x"), ErrorCode::PageOutOfRange),
        (write_call(&net, owner, 0, 10, b"x"), ErrorCode::PageNotFound),
        (write_call(&net, owner, 0, 0, &[1u8; 81]), ErrorCode::WriteOutOfBounds),
    ];
    for (call, code) in cases {
        let err = net.ledger.submit_group(vec![call]).await.unwrap_err();
        assert_eq!(err.code, code);
    }

    net.ledger
        .submit_group(vec![write_call(&net, owner, 0, 0, &[1u8; 40])])
        .await
        .unwrap();
    let err = net
        .ledger
        .submit_group(vec![write_call(&net, owner, 0, 0, b"again")])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PageExists);

    net.ledger
        .submit_group(vec![write_call(&net, owner, 0, 40, &[2u8; 40])])
        .await
        .unwrap();
    let page = net.ledger.page(net.app_id, 0).await.unwrap().unwrap();
    assert_eq!(&page[..40], &[1u8; 40][..]);
    assert_eq!(&page[40..], &[2u8; 40][..]);

    net.ledger
        .submit_group(vec![app_call(
            &net,
            Method::FinishUpload { owner },
            vec![BoxName::Metadata(owner)],
        )])
        .await
        .unwrap();
    let err = net
        .ledger
        .submit_group(vec![write_call(&net, owner, 0, 0, b"late")])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidStatus);
}

#[tokio::test]
async fn test_delete_gating_and_order() {
    let net = deploy(LedgerParams::default());
    let owner = OwnerKey::from_name("alice");
    let meta_ref = vec![BoxName::Metadata(owner)];

    // 70000 bytes: pages 0, 1, 2
    net.client
        .upload_document(owner, random_bytes(70_000))
        .await
        .unwrap();

    let delete = |page: u64| {
        let mut boxes = vec![BoxName::Metadata(owner)];
        boxes.extend(vec![BoxName::Page(page); 7]);
        let mut group = vec![app_call(&net, Method::DeletePage { owner, page }, boxes)];
        for _ in 0..4 {
            group.push(app_call(&net, Method::Dummy, vec![BoxName::Page(page); 8]));
        }
        group
    };

    let err = net.ledger.submit_group(delete(0)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidStatus);

    net.ledger
        .submit_group(vec![app_call(&net, Method::StartDelete { owner }, meta_ref.clone())])
        .await
        .unwrap();
    let err = net
        .ledger
        .submit_group(vec![app_call(&net, Method::StartDelete { owner }, meta_ref)])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidStatus);

    let err = net.ledger.submit_group(delete(2)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::DeleteOrderViolation);
    let err = net.ledger.submit_group(delete(3)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::PageOutOfRange);

    net.ledger.submit_group(delete(0)).await.unwrap();
    net.ledger.submit_group(delete(1)).await.unwrap();
    let record = metadata(&net, &owner).await.unwrap();
    assert_eq!(record.status, Status::Deleting);
    assert_eq!(record.last_deleted, 1);

    net.ledger.submit_group(delete(2)).await.unwrap();
    assert!(metadata(&net, &owner).await.is_none());
}

#[tokio::test]
async fn test_ledger_limits() {
    let params = LedgerParams::default();
    let net = deploy(params.clone());
    let owner = OwnerKey::from_name("alice");
    net.ledger
        .submit_group(start_upload_group(
            &net,
            owner,
            1,
            params.max_page_size,
            upload_cost(&params, 1, params.max_page_size),
        ))
        .await
        .unwrap();

    // One byte past the envelope
    let err = net
        .ledger
        .submit_group(vec![write_call(&net, owner, 0, 0, &vec![0u8; 1_995])])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::EnvelopeTooLarge);

    // Eight references cannot cover a 32 KiB page
    let err = net
        .ledger
        .submit_group(vec![write_call(&net, owner, 0, 0, &vec![0u8; 1_994])])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::IoBudgetExceeded);

    let mut group = vec![write_call(&net, owner, 0, 0, &vec![0u8; 1_994])];
    for _ in 0..4 {
        group.push(app_call(&net, Method::Dummy, vec![BoxName::Page(0); 8]));
    }
    net.ledger.submit_group(group).await.unwrap();
}

#[tokio::test]
async fn test_rejected_group_has_no_effect() {
    let params = LedgerParams::default();
    let net = deploy(params.clone());
    let owner = OwnerKey::from_name("alice");
    let escrow = Address::for_application(net.app_id);
    let admin_before = balance(&net, &net.admin).await;
    let escrow_before = balance(&net, &escrow).await;

    let mut group = start_upload_group(&net, owner, 1, 80, upload_cost(&params, 1, 80));
    group.push(write_call(&net, owner, 5, 0, b"x"));
    let err = net.ledger.submit_group(group).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::PageOutOfRange);

    assert!(metadata(&net, &owner).await.is_none());
    assert_eq!(net.ledger.globals(net.app_id).unwrap().cursor, 0);
    assert_eq!(balance(&net, &net.admin).await, admin_before);
    assert_eq!(balance(&net, &escrow).await, escrow_before);
}

#[tokio::test]
async fn test_payment_equals_reserve_growth() {
    let params = LedgerParams::default();
    let net = deploy(params.clone());
    let escrow = Address::for_application(net.app_id);
    let owner = OwnerKey::from_name("alice");
    let document = Bytes::from(vec![9u8; 40_000]);

    net.client.upload_document(owner, document).await.unwrap();

    let reserve = net.ledger.min_balance(&escrow).await.unwrap();
    assert_eq!(
        reserve,
        params.account_min_balance + upload_cost(&params, 2, 7_232)
    );
    assert_eq!(balance(&net, &escrow).await, reserve);
}

#[tokio::test]
async fn test_update_application_bumps_version() {
    let net = deploy(LedgerParams::default());
    net.ledger
        .submit_group(vec![app_call(&net, Method::UpdateApplication, vec![])])
        .await
        .unwrap();
    assert_eq!(net.ledger.globals(net.app_id).unwrap().version, 1);
}
