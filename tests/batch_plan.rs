use bunny_finder::batch_plan::BatchPlan;

#[test]
fn forty_five_in_twenties() {
    let plan = BatchPlan::new(45, 20);
    let sizes: Vec<usize> = plan.batches.iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![20, 20, 5]);
    assert_eq!(plan.batches[2].offset, 40);
    assert_eq!(plan.batches.last().unwrap().end, 45);
}

#[test]
fn batch_count_is_ceiling() {
    for total in 0..70usize {
        for n in 1..25usize {
            let plan = BatchPlan::new(total, n);
            assert_eq!(plan.len(), total.div_ceil(n));
            let mut expected_offset = 0;
            for (i, b) in plan.batches.iter().enumerate() {
                assert_eq!(b.offset, expected_offset);
                if i + 1 < plan.len() {
                    assert_eq!(b.len(), n);
                } else {
                    let tail = if total % n == 0 { n } else { total % n };
                    assert_eq!(b.len(), tail);
                }
                expected_offset = b.end;
            }
            assert_eq!(expected_offset, total);
        }
    }
}

#[test]
fn empty_list_has_no_batches() {
    assert!(BatchPlan::new(0, 20).is_empty());
}

#[test]
fn zero_batch_size_acts_as_one() {
    let plan = BatchPlan::new(3, 0);
    assert_eq!(plan.batch_size, 1);
    assert_eq!(plan.len(), 3);
}
