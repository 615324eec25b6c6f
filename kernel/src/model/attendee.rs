use crate::model::{
    id::{AttendeeId, UserId},
    user::AttendeeUser,
};
use chrono::{DateTime, Utc};
use shared::error::{AppError, AppResult};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum AttendeeStatus {
    Confirmed,
    Waitlist,
    Cancelled,
}

impl AttendeeStatus {
    // cancelled 以外はアクティブな参加エントリとして扱う
    pub fn is_active(self) -> bool {
        !matches!(self, AttendeeStatus::Cancelled)
    }

    // confirmed / waitlist -> cancelled
    // cancelled は終端状態なので、再度のキャンセルは NotRegistered
    pub fn cancel(self) -> AppResult<Self> {
        match self {
            AttendeeStatus::Confirmed | AttendeeStatus::Waitlist => Ok(AttendeeStatus::Cancelled),
            AttendeeStatus::Cancelled => Err(AppError::NotRegistered),
        }
    }

    // waitlist -> confirmed
    pub fn promote(self) -> AppResult<Self> {
        match self {
            AttendeeStatus::Waitlist => Ok(AttendeeStatus::Confirmed),
            other => Err(AppError::UnprocessableEntity(format!(
                "attendee in state `{}` cannot be promoted",
                other.as_ref()
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attendee {
    pub attendee_id: AttendeeId,
    pub user_id: UserId,
    pub status: AttendeeStatus,
    pub registered_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

// 参加者一覧の表示用。user をプロフィール情報に展開したもの
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendeeView {
    pub attendee_id: AttendeeId,
    pub user: AttendeeUser,
    pub status: AttendeeStatus,
    pub registered_at: DateTime<Utc>,
}

// 定員。1 以上であることを型で保証する
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Capacity(u32);

impl Capacity {
    pub fn new(value: u32) -> AppResult<Self> {
        if value == 0 {
            return Err(AppError::UnprocessableEntity(
                "Capacity must be at least 1".into(),
            ));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<i32> for Capacity {
    type Error = AppError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        let value = u32::try_from(value)
            .map_err(|_| AppError::ConversionEntityError(format!("invalid capacity: {value}")))?;
        Self::new(value)
    }
}

impl From<Capacity> for i32 {
    fn from(value: Capacity) -> Self {
        i32::try_from(value.0).unwrap_or(i32::MAX)
    }
}

// 参加登録の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub attendee: Attendee,
}

// キャンセルの結果。繰り上げがあった場合は promoted に入る
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    pub cancelled: Attendee,
    pub promoted: Option<Attendee>,
}

// イベントの参加者名簿。登録順に並ぶ
// 定員チェックと追加は必ずこの型のメソッドを通して行う。
// 呼び出し側はイベント単位の排他（ロックまたはトランザクション）の中で使うこと
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    capacity: Capacity,
    waitlist_enabled: bool,
    entries: Vec<Attendee>,
}

impl Roster {
    pub fn new(capacity: Capacity, waitlist_enabled: bool, entries: Vec<Attendee>) -> Self {
        Self {
            capacity,
            waitlist_enabled,
            entries,
        }
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn waitlist_enabled(&self) -> bool {
        self.waitlist_enabled
    }

    pub fn entries(&self) -> &[Attendee] {
        &self.entries
    }

    pub fn active_entries(&self) -> impl Iterator<Item = &Attendee> {
        self.entries.iter().filter(|a| a.status.is_active())
    }

    pub fn confirmed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|a| a.status == AttendeeStatus::Confirmed)
            .count()
    }

    pub fn active_entry_of(&self, user_id: UserId) -> Option<&Attendee> {
        self.active_entries().find(|a| a.user_id == user_id)
    }

    pub fn is_full(&self) -> bool {
        self.confirmed_count() >= self.capacity.get() as usize
    }

    // 参加登録の判定と追加を行う
    // 1. 同じユーザーのアクティブなエントリがあれば DuplicateRegistration
    // 2. 満席なら CapacityExceeded（キャンセル待ちが有効なら waitlist で追加）
    // 3. それ以外は confirmed で末尾に追加
    pub fn admit(&mut self, user_id: UserId, now: DateTime<Utc>) -> AppResult<Admission> {
        if self.active_entry_of(user_id).is_some() {
            return Err(AppError::DuplicateRegistration);
        }

        let status = match (self.is_full(), self.waitlist_enabled) {
            (false, _) => AttendeeStatus::Confirmed,
            (true, true) => AttendeeStatus::Waitlist,
            (true, false) => return Err(AppError::CapacityExceeded),
        };

        let attendee = Attendee {
            attendee_id: AttendeeId::new(),
            user_id,
            status,
            registered_at: now,
            cancelled_at: None,
        };
        self.entries.push(attendee.clone());

        Ok(Admission { attendee })
    }

    // 参加キャンセル
    // confirmed のエントリが抜けた場合、登録順で最も古い waitlist を繰り上げる
    pub fn withdraw(&mut self, user_id: UserId, now: DateTime<Utc>) -> AppResult<Withdrawal> {
        let index = self
            .entries
            .iter()
            .position(|a| a.user_id == user_id && a.status.is_active())
            .ok_or(AppError::NotRegistered)?;

        let entry = &mut self.entries[index];
        let was_confirmed = entry.status == AttendeeStatus::Confirmed;
        entry.status = entry.status.cancel()?;
        entry.cancelled_at = Some(now);
        let cancelled = entry.clone();

        let promoted = if was_confirmed && !self.is_full() {
            self.promote_next()?
        } else {
            None
        };

        Ok(Withdrawal {
            cancelled,
            promoted,
        })
    }

    // 定員とキャンセル待ち設定の変更
    // 確定済みの人数を下回る定員は CapacityBelowConfirmed。
    // 定員が増えた分は、登録順にキャンセル待ちを繰り上げる
    pub fn reconfigure(
        &mut self,
        capacity: Capacity,
        waitlist_enabled: bool,
    ) -> AppResult<Vec<Attendee>> {
        let confirmed = self.confirmed_count();
        if (capacity.get() as usize) < confirmed {
            return Err(AppError::CapacityBelowConfirmed(confirmed));
        }
        self.capacity = capacity;
        self.waitlist_enabled = waitlist_enabled;

        let mut promoted = Vec::new();
        while !self.is_full() {
            match self.promote_next()? {
                Some(attendee) => promoted.push(attendee),
                None => break,
            }
        }
        Ok(promoted)
    }

    fn promote_next(&mut self) -> AppResult<Option<Attendee>> {
        let Some(next) = self
            .entries
            .iter_mut()
            .find(|a| a.status == AttendeeStatus::Waitlist)
        else {
            return Ok(None);
        };
        next.status = next.status.promote()?;
        Ok(Some(next.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roster(capacity: u32, waitlist_enabled: bool) -> Roster {
        Roster::new(Capacity::new(capacity).unwrap(), waitlist_enabled, vec![])
    }

    #[test]
    fn active_statuses() {
        for (status, expected) in [
            (AttendeeStatus::Confirmed, true),
            (AttendeeStatus::Waitlist, true),
            (AttendeeStatus::Cancelled, false),
        ] {
            assert_eq!(status.is_active(), expected, "{status:?}");
        }
    }

    #[test]
    fn cancelled_is_terminal() {
        assert_eq!(
            AttendeeStatus::Confirmed.cancel().unwrap(),
            AttendeeStatus::Cancelled
        );
        assert!(matches!(
            AttendeeStatus::Cancelled.cancel(),
            Err(AppError::NotRegistered)
        ));
        assert!(AttendeeStatus::Cancelled.promote().is_err());
        assert!(AttendeeStatus::Confirmed.promote().is_err());
    }

    #[test]
    fn status_string_mapping() {
        for (raw, status) in [
            ("confirmed", AttendeeStatus::Confirmed),
            ("waitlist", AttendeeStatus::Waitlist),
            ("cancelled", AttendeeStatus::Cancelled),
        ] {
            assert_eq!(raw.parse::<AttendeeStatus>().unwrap(), status);
            assert_eq!(status.as_ref(), raw);
        }
    }

    #[test]
    fn capacity_must_be_positive() {
        assert!(Capacity::new(0).is_err());
        assert!(Capacity::try_from(-3).is_err());
        assert_eq!(Capacity::try_from(10).unwrap().get(), 10);
    }

    #[test]
    fn admit_until_full_then_reject() {
        let mut roster = roster(2, false);
        let now = Utc::now();
        roster.admit(UserId::new(), now).unwrap();
        roster.admit(UserId::new(), now).unwrap();

        let res = roster.admit(UserId::new(), now);
        assert!(matches!(res, Err(AppError::CapacityExceeded)));
        assert_eq!(roster.confirmed_count(), 2);
        assert_eq!(roster.entries().len(), 2);
    }

    #[test]
    fn duplicate_is_checked_before_capacity() {
        let mut roster = roster(1, false);
        let user = UserId::new();
        roster.admit(user, Utc::now()).unwrap();

        // 満席だが、同一ユーザーなら重複エラーを優先する
        let res = roster.admit(user, Utc::now());
        assert!(matches!(res, Err(AppError::DuplicateRegistration)));
        assert_eq!(roster.confirmed_count(), 1);
    }

    #[test]
    fn withdraw_then_readmit_creates_fresh_entry() {
        let mut roster = roster(3, false);
        let user = UserId::new();
        let first = roster.admit(user, Utc::now()).unwrap().attendee;
        let withdrawal = roster.withdraw(user, Utc::now()).unwrap();
        assert_eq!(withdrawal.cancelled.attendee_id, first.attendee_id);
        assert_eq!(withdrawal.cancelled.status, AttendeeStatus::Cancelled);
        assert!(withdrawal.cancelled.cancelled_at.is_some());
        assert_eq!(roster.confirmed_count(), 0);

        let second = roster.admit(user, Utc::now()).unwrap().attendee;
        assert_ne!(first.attendee_id, second.attendee_id);
        assert_eq!(roster.confirmed_count(), 1);
        // 履歴としてキャンセル済みのエントリも残る
        assert_eq!(roster.entries().len(), 2);
    }

    #[test]
    fn withdraw_twice_is_not_registered() {
        let mut roster = roster(3, false);
        let user = UserId::new();
        roster.admit(user, Utc::now()).unwrap();
        roster.withdraw(user, Utc::now()).unwrap();

        let res = roster.withdraw(user, Utc::now());
        assert!(matches!(res, Err(AppError::NotRegistered)));
    }

    #[test]
    fn withdraw_without_entry_leaves_roster_unchanged() {
        let mut roster = roster(3, false);
        roster.admit(UserId::new(), Utc::now()).unwrap();
        let before = roster.clone();

        let res = roster.withdraw(UserId::new(), Utc::now());
        assert!(matches!(res, Err(AppError::NotRegistered)));
        assert_eq!(roster, before);
    }

    #[test]
    fn keeps_registration_order() {
        let mut roster = roster(5, false);
        let users = [UserId::new(), UserId::new(), UserId::new()];
        for user in users {
            roster.admit(user, Utc::now()).unwrap();
        }
        let order: Vec<UserId> = roster.active_entries().map(|a| a.user_id).collect();
        assert_eq!(order, users);
    }

    #[test]
    fn full_event_with_waitlist_queues_and_promotes_in_order() {
        let mut roster = roster(1, true);
        let (u1, u2, u3) = (UserId::new(), UserId::new(), UserId::new());
        roster.admit(u1, Utc::now()).unwrap();
        let queued = roster.admit(u2, Utc::now()).unwrap().attendee;
        roster.admit(u3, Utc::now()).unwrap();
        assert_eq!(queued.status, AttendeeStatus::Waitlist);
        assert_eq!(roster.confirmed_count(), 1);

        let withdrawal = roster.withdraw(u1, Utc::now()).unwrap();
        let promoted = withdrawal.promoted.unwrap();
        assert_eq!(promoted.user_id, u2);
        assert_eq!(promoted.status, AttendeeStatus::Confirmed);
        assert_eq!(roster.confirmed_count(), 1);
        assert_eq!(
            roster.active_entry_of(u3).map(|a| a.status),
            Some(AttendeeStatus::Waitlist)
        );
    }

    #[test]
    fn cancelling_waitlisted_entry_promotes_nobody() {
        let mut roster = roster(1, true);
        let (u1, u2) = (UserId::new(), UserId::new());
        roster.admit(u1, Utc::now()).unwrap();
        roster.admit(u2, Utc::now()).unwrap();

        let withdrawal = roster.withdraw(u2, Utc::now()).unwrap();
        assert!(withdrawal.promoted.is_none());
        assert_eq!(roster.confirmed_count(), 1);
    }

    #[test]
    fn shrinking_below_confirmed_is_rejected() {
        let mut roster = roster(3, false);
        roster.admit(UserId::new(), Utc::now()).unwrap();
        roster.admit(UserId::new(), Utc::now()).unwrap();
        let before = roster.clone();

        let res = roster.reconfigure(Capacity::new(1).unwrap(), false);
        assert!(matches!(res, Err(AppError::CapacityBelowConfirmed(2))));
        assert_eq!(roster, before);

        // 確定済みの人数ちょうどまでは縮められる
        let promoted = roster.reconfigure(Capacity::new(2).unwrap(), false).unwrap();
        assert!(promoted.is_empty());
        assert!(roster.is_full());
        let res = roster.admit(UserId::new(), Utc::now());
        assert!(matches!(res, Err(AppError::CapacityExceeded)));
    }

    #[test]
    fn growing_capacity_promotes_waitlist_in_order() {
        let mut roster = roster(1, true);
        let (u1, u2, u3) = (UserId::new(), UserId::new(), UserId::new());
        for user in [u1, u2, u3] {
            roster.admit(user, Utc::now()).unwrap();
        }

        let promoted = roster.reconfigure(Capacity::new(2).unwrap(), true).unwrap();
        assert_eq!(promoted.iter().map(|a| a.user_id).collect::<Vec<_>>(), [u2]);
        assert_eq!(roster.confirmed_count(), 2);
        assert_eq!(
            roster.active_entry_of(u3).map(|a| a.status),
            Some(AttendeeStatus::Waitlist)
        );
    }

    #[derive(Debug, Clone)]
    enum Op {
        Admit(usize),
        Withdraw(usize),
        Resize(u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..6usize).prop_map(Op::Admit),
            (0..6usize).prop_map(Op::Withdraw),
            (1u32..5).prop_map(Op::Resize),
        ]
    }

    /// Property: whatever sequence of admits, withdrawals and resizes runs against a roster,
    /// confirmed entries never exceed capacity and no user holds two active entries.
    #[test]
    fn roster_invariants_hold_for_any_operation_sequence() {
        proptest!(|(
            capacity in 1u32..4,
            waitlist_enabled in any::<bool>(),
            ops in prop::collection::vec(op(), 0..40),
        )| {
            let users: Vec<UserId> = (0..6).map(|_| UserId::new()).collect();
            let mut roster = roster(capacity, waitlist_enabled);

            for op in ops {
                let _ = match op {
                    Op::Admit(i) => roster.admit(users[i], Utc::now()).map(|_| ()),
                    Op::Withdraw(i) => roster.withdraw(users[i], Utc::now()).map(|_| ()),
                    Op::Resize(n) => roster
                        .reconfigure(Capacity::new(n).unwrap(), waitlist_enabled)
                        .map(|_| ()),
                };

                prop_assert!(roster.confirmed_count() <= roster.capacity().get() as usize);
                for user in &users {
                    let active = roster.active_entries().filter(|a| a.user_id == *user).count();
                    prop_assert!(active <= 1);
                }
                // 空席がある間は誰もキャンセル待ちに残らない
                if !roster.is_full() {
                    prop_assert!(roster
                        .active_entries()
                        .all(|a| a.status == AttendeeStatus::Confirmed));
                }
            }
        });
    }
}
