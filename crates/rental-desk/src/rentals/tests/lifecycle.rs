use crate::rentals::domain::{DocumentRecord, Documents, PaymentStatus, RentalStatus};
use crate::rentals::gate::DocumentGate;
use crate::rentals::lifecycle::{check_payment_transition, check_status_transition, LifecycleError};

fn gate(satisfied: bool) -> DocumentGate {
    DocumentGate::new(Documents {
        national_id: DocumentRecord {
            manually_verified: satisfied,
            ..DocumentRecord::unverified("234567890123", None)
        },
        tax_id: DocumentRecord {
            manually_verified: satisfied,
            ..DocumentRecord::unverified("ABCDE1234F", None)
        },
        cheque_submitted: satisfied,
    })
}

#[test]
fn only_table_edges_are_accepted() {
    let allowed = [
        (RentalStatus::Pending, RentalStatus::DocumentVerification),
        (RentalStatus::Pending, RentalStatus::Rejected),
        (RentalStatus::Pending, RentalStatus::Cancelled),
        (RentalStatus::DocumentVerification, RentalStatus::Approved),
        (RentalStatus::DocumentVerification, RentalStatus::Rejected),
        (RentalStatus::DocumentVerification, RentalStatus::Cancelled),
        (RentalStatus::Approved, RentalStatus::Delivered),
        (RentalStatus::Approved, RentalStatus::Cancelled),
        (RentalStatus::Delivered, RentalStatus::Returned),
    ];

    let open_gate = gate(true);
    for from in RentalStatus::ALL {
        for to in RentalStatus::ALL {
            let result = check_status_transition(from, to, &open_gate);
            if allowed.contains(&(from, to)) {
                assert!(result.is_ok(), "{from:?} -> {to:?} should be allowed");
            } else {
                assert!(
                    matches!(result, Err(LifecycleError::InvalidTransition { .. })),
                    "{from:?} -> {to:?} should be refused, got {result:?}"
                );
            }
        }
    }
}

#[test]
fn approval_requires_a_satisfied_gate() {
    match check_status_transition(
        RentalStatus::DocumentVerification,
        RentalStatus::Approved,
        &gate(false),
    ) {
        Err(LifecycleError::DocumentsNotVerified { outstanding }) => {
            assert_eq!(outstanding, vec!["nationalId", "taxId", "chequeSubmitted"])
        }
        other => panic!("expected documents not verified, got {other:?}"),
    }
}

#[test]
fn cancellation_ignores_document_state() {
    for from in [
        RentalStatus::Pending,
        RentalStatus::DocumentVerification,
        RentalStatus::Approved,
    ] {
        assert!(check_status_transition(from, RentalStatus::Cancelled, &gate(false)).is_ok());
    }
}

#[test]
fn terminal_states_have_no_exits() {
    for status in [
        RentalStatus::Returned,
        RentalStatus::Rejected,
        RentalStatus::Cancelled,
    ] {
        assert!(status.is_terminal());
        assert!(!status.is_active());
    }
}

#[test]
fn payment_follows_advance_then_full() {
    let status = RentalStatus::Approved;
    for (from, to) in [
        (PaymentStatus::Pending, PaymentStatus::AdvancePaid),
        (PaymentStatus::AdvancePaid, PaymentStatus::FullyPaid),
    ] {
        assert!(
            check_payment_transition(status, from, to).is_ok(),
            "{from:?} -> {to:?} should be allowed"
        );
    }
    assert!(matches!(
        check_payment_transition(status, PaymentStatus::Pending, PaymentStatus::FullyPaid),
        Err(LifecycleError::InvalidPaymentTransition { .. })
    ));
    assert!(matches!(
        check_payment_transition(status, PaymentStatus::FullyPaid, PaymentStatus::AdvancePaid),
        Err(LifecycleError::InvalidPaymentTransition { .. })
    ));
}

#[test]
fn refund_is_unreachable_while_rental_is_active() {
    for status in [
        RentalStatus::Pending,
        RentalStatus::DocumentVerification,
        RentalStatus::Approved,
        RentalStatus::Delivered,
    ] {
        for current in [PaymentStatus::AdvancePaid, PaymentStatus::FullyPaid] {
            assert!(matches!(
                check_payment_transition(status, current, PaymentStatus::Refunded),
                Err(LifecycleError::RefundNotEligible { .. })
            ));
        }
    }
}

#[test]
fn refund_needs_money_collected_first() {
    assert!(check_payment_transition(
        RentalStatus::Returned,
        PaymentStatus::FullyPaid,
        PaymentStatus::Refunded
    )
    .is_ok());
    assert!(check_payment_transition(
        RentalStatus::Cancelled,
        PaymentStatus::AdvancePaid,
        PaymentStatus::Refunded
    )
    .is_ok());
    assert!(matches!(
        check_payment_transition(
            RentalStatus::Rejected,
            PaymentStatus::Pending,
            PaymentStatus::Refunded
        ),
        Err(LifecycleError::InvalidPaymentTransition { .. })
    ));
}

#[test]
fn retryable_errors_are_distinguished() {
    use crate::rentals::domain::DocumentKind;
    use crate::rentals::repository::RepositoryError;

    assert!(LifecycleError::from(RepositoryError::Unavailable("down".to_string())).is_retryable());
    assert!(LifecycleError::VerificationUnavailable {
        kind: DocumentKind::TaxId
    }
    .is_retryable());
    assert!(!LifecycleError::VerificationRejected {
        kind: DocumentKind::TaxId,
        reason: "no record".to_string()
    }
    .is_retryable());
    assert!(matches!(
        LifecycleError::from(RepositoryError::NotFound),
        LifecycleError::NotFound
    ));
}
