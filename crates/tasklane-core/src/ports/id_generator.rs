//! IdGenerator port - TaskId 生成の抽象化
//!
//! producer が投入時に一度だけ TaskId を割り当てます。Dispatcher は
//! この ID を重複排除の唯一のキーとして信頼するため、衝突耐性が必要です。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（時刻でソート可能、分散生成可能）

use ulid::Ulid;

use crate::domain::{TaskId, TaskType};
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self, task_type: &TaskType) -> TaskId;
}

/// Clock を使って現在時刻ベースの ULID を生成します。
/// テスト時に FixedClock を使うと timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self, task_type: &TaskType) -> TaskId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        TaskId::from_parts(task_type, ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);
        let tt = TaskType::send_email();

        let id1 = id_gen.generate_task_id(&tt);
        let id2 = id_gen.generate_task_id(&tt);
        let id3 = id_gen.generate_task_id(&tt);

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn ulid_generator_with_fixed_clock_shares_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));
        let tt = TaskType::process_data();

        let id1 = id_gen.generate_task_id(&tt);
        let id2 = id_gen.generate_task_id(&tt);

        // ランダム部分があるので ID は異なる
        assert_ne!(id1, id2);

        let ulid_of = |id: &TaskId| -> Ulid {
            let raw = id.as_str().strip_prefix("PROCESS_DATA-").unwrap();
            Ulid::from_string(raw).unwrap()
        };
        assert_eq!(ulid_of(&id1).timestamp_ms(), fixed_time.timestamp_millis() as u64);
        assert_eq!(ulid_of(&id2).timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn ids_are_prefixed_with_task_type() {
        let id_gen = UlidGenerator::new(SystemClock);
        let id = id_gen.generate_task_id(&TaskType::image_resize());
        assert!(id.as_str().starts_with("IMAGE_RESIZE-"));
    }
}
