use crate::common::Operation::{Erase, Read, Write};
use crate::common::{LINES_PER_PAGE, PAGE_SIZE, WORD_SIZE};
use flash_eeprom::Eeprom;
use pretty_assertions::assert_eq;

mod common;

fn scan(page: usize, lines: std::ops::Range<usize>) -> Vec<common::Operation> {
    lines
        .map(|line| Read {
            offset: (page * PAGE_SIZE + line * WORD_SIZE) as _,
            len: WORD_SIZE,
        })
        .collect()
}

#[test]
fn open_probes_single_line() {
    let mut flash = common::Flash::new(2);

    Eeprom::new(common::CONFIG, &mut flash).unwrap();

    assert_eq!(
        flash.operations,
        vec![Read {
            offset: PAGE_SIZE as _,
            len: WORD_SIZE,
        }]
    );
}

#[test]
fn single_value() {
    let mut flash = common::Flash::new(2);

    let mut eeprom = Eeprom::new(common::CONFIG, &mut flash).unwrap();
    eeprom.set_value(42, 0xBEEF).unwrap();

    let mut ops = scan(1, 0..1);
    // look up the current value
    ops.extend(scan(0, 0..LINES_PER_PAGE));
    // find the first free line
    ops.extend(scan(0, 0..1));
    ops.push(Write {
        offset: 0,
        len: WORD_SIZE,
    });

    assert_eq!(flash.operations, ops);
}

#[test]
fn page_switch() {
    let mut flash = common::Flash::new(2);

    {
        let mut eeprom = Eeprom::new(common::CONFIG, &mut flash).unwrap();
        for i in 0..LINES_PER_PAGE as u16 {
            eeprom.set_value(0, i).unwrap();
        }
    }
    flash.operations.clear();

    let mut eeprom = Eeprom::new(common::CONFIG, &mut flash).unwrap();
    eeprom.set_value(1, 1).unwrap();

    let mut ops = scan(1, 0..1);
    ops.extend(scan(0, 0..LINES_PER_PAGE));
    // no free line left
    ops.extend(scan(0, 0..LINES_PER_PAGE));
    // the inactive page is already erased
    ops.extend(scan(1, 0..LINES_PER_PAGE));
    // the latest line is copied, every older one is skipped
    ops.extend(scan(0, LINES_PER_PAGE - 1..LINES_PER_PAGE));
    ops.push(Write {
        offset: PAGE_SIZE as _,
        len: WORD_SIZE,
    });
    ops.extend(scan(0, 0..LINES_PER_PAGE - 1).into_iter().rev());
    ops.push(Erase {
        offset: 0,
        len: PAGE_SIZE,
    });
    ops.extend(scan(1, 0..2));
    ops.push(Write {
        offset: (PAGE_SIZE + WORD_SIZE) as _,
        len: WORD_SIZE,
    });

    assert_eq!(flash.operations, ops);
}
