mod clock_test;
mod db_io_test;
